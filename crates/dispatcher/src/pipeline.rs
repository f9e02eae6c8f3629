use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use adaptation_core::{DispatchOutcome, InboundMessage, MetricsRecorder, WorkerHandle};

use crate::ack_policy::{AckDecision, AckPolicy};
use crate::coordinator::DispatchCoordinator;
use crate::redelivery::RedeliveryTracker;
use crate::validator::extract_fields;

/// 记录到直方图的最小耗时，保证延迟值严格为正
const MIN_RECORDED_LATENCY: Duration = Duration::from_micros(1);

/// 在析构时记录处理耗时，覆盖包括提前返回在内的所有路径
struct ProcessingTimer {
    started_at: Instant,
    metrics: Arc<dyn MetricsRecorder>,
}

impl ProcessingTimer {
    fn start(metrics: Arc<dyn MetricsRecorder>) -> Self {
        Self {
            started_at: Instant::now(),
            metrics,
        }
    }
}

impl Drop for ProcessingTimer {
    fn drop(&mut self) {
        let elapsed = self.started_at.elapsed().max(MIN_RECORDED_LATENCY);
        self.metrics.record_processing_time(elapsed);
    }
}

/// 单条消息的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingReport {
    pub outcome: DispatchOutcome,
    pub decision: AckDecision,
    pub worker: Option<WorkerHandle>,
}

/// 单条消息处理流水线：校验、分发、计数、给出确认决定
///
/// 所有错误都在这里被吸收，不会向消费循环传播。
pub struct MessageProcessor {
    coordinator: DispatchCoordinator,
    metrics: Arc<dyn MetricsRecorder>,
    policy: AckPolicy,
    redeliveries: RedeliveryTracker,
}

impl MessageProcessor {
    pub fn new(
        coordinator: DispatchCoordinator,
        metrics: Arc<dyn MetricsRecorder>,
        policy: AckPolicy,
    ) -> Self {
        Self {
            coordinator,
            metrics,
            policy,
            redeliveries: RedeliveryTracker::new(),
        }
    }

    pub async fn process(&self, message: &InboundMessage) -> ProcessingReport {
        let _timer = ProcessingTimer::start(Arc::clone(&self.metrics));

        let (outcome, worker, file_id) = match extract_fields(message) {
            Err(e) => {
                warn!(
                    delivery_tag = message.delivery_tag,
                    error = %e,
                    "消息头校验失败，丢弃消息"
                );
                (DispatchOutcome::ValidationFailed, None, None)
            }
            Ok(fields) => {
                info!(
                    delivery_tag = message.delivery_tag,
                    file_id = %fields.file_id,
                    redelivered = message.redelivered,
                    "收到文件适配请求"
                );
                let file_id = fields.file_id.clone();
                match self
                    .coordinator
                    .dispatch(fields, message.reply_to.clone())
                    .await
                {
                    Ok(handle) => (DispatchOutcome::Accepted, Some(handle), Some(file_id)),
                    Err(e) => {
                        error!(
                            delivery_tag = message.delivery_tag,
                            file_id = %file_id,
                            error = %e,
                            "处理消息失败"
                        );
                        (e.outcome(), None, Some(file_id))
                    }
                }
            }
        };

        self.metrics.record_outcome(outcome);
        let decision = match file_id {
            Some(file_id) => self.decide_tracked(message, outcome, &file_id),
            None => self.policy.decide(outcome, message.delivery_count()),
        };

        ProcessingReport {
            outcome,
            decision,
            worker,
        }
    }

    /// 瞬时错误的投递次数取broker消息头与进程内计数中较大的一个
    fn decide_tracked(
        &self,
        message: &InboundMessage,
        outcome: DispatchOutcome,
        file_id: &str,
    ) -> AckDecision {
        let failures = self.redeliveries.failures_before(file_id, message.redelivered);
        if !outcome.is_transient() {
            self.redeliveries.forget(file_id);
            return self.policy.decide(outcome, message.delivery_count());
        }

        let delivery_count = message.delivery_count().unwrap_or(0).max(failures);
        let decision = self.policy.decide(outcome, Some(delivery_count));
        match decision {
            AckDecision::Nack { requeue: true } => {
                self.redeliveries.record_requeue(file_id, delivery_count.saturating_add(1))
            }
            _ => self.redeliveries.forget(file_id),
        }
        decision
    }
}
