use std::time::Duration;

use crate::models::DispatchOutcome;

/// 消息处理指标记录接口
pub trait MetricsRecorder: Send + Sync {
    /// 记录单条消息的处理耗时
    fn record_processing_time(&self, elapsed: Duration);

    /// 按处理结果累加消费计数
    fn record_outcome(&self, outcome: DispatchOutcome);
}

/// 不记录任何指标
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsRecorder;

impl MetricsRecorder for NoopMetricsRecorder {
    fn record_processing_time(&self, _elapsed: Duration) {}

    fn record_outcome(&self, _outcome: DispatchOutcome) {}
}
