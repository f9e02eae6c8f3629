//! 基于 metrics 门面的指标记录器

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

use adaptation_core::{DispatchOutcome, MetricsRecorder};

pub const MESSAGE_PROCESSING_TIME: &str = "message_processing_time_millisecond";
pub const MESSAGES_CONSUMED_TOTAL: &str = "messages_consumed_total";
const STATUS_LABEL: &str = "status";

/// 注册指标描述，并让每个状态标签在第一次抓取时就以0出现
pub fn describe_metrics() {
    describe_histogram!(
        MESSAGE_PROCESSING_TIME,
        Unit::Milliseconds,
        "Time taken to process queue message"
    );
    describe_counter!(
        MESSAGES_CONSUMED_TOTAL,
        Unit::Count,
        "Number of messages consumed from the adaptation request queue"
    );

    for outcome in DispatchOutcome::ALL {
        counter!(MESSAGES_CONSUMED_TOTAL, STATUS_LABEL => outcome.label()).absolute(0);
    }
}

/// 写入全局 metrics 记录器；未安装导出器时调用是空操作
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMetricsRecorder;

impl PrometheusMetricsRecorder {
    pub fn new() -> Self {
        Self
    }
}

impl MetricsRecorder for PrometheusMetricsRecorder {
    fn record_processing_time(&self, elapsed: Duration) {
        histogram!(MESSAGE_PROCESSING_TIME).record(elapsed.as_secs_f64() * 1000.0);
    }

    fn record_outcome(&self, outcome: DispatchOutcome) {
        counter!(MESSAGES_CONSUMED_TOTAL, STATUS_LABEL => outcome.label()).increment(1);
    }
}
