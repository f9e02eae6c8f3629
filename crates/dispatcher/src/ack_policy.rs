use tracing::warn;

use adaptation_core::DispatchOutcome;

/// 对一条消息的确认决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckDecision {
    Ack,
    Nack { requeue: bool },
}

/// 瞬时错误的重新投递上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeliveryPolicy {
    /// 0表示不限制
    pub max_redeliveries: u32,
}

impl Default for RedeliveryPolicy {
    fn default() -> Self {
        Self {
            max_redeliveries: 10,
        }
    }
}

impl RedeliveryPolicy {
    pub fn unbounded() -> Self {
        Self { max_redeliveries: 0 }
    }

    /// 投递次数已知且达到上限时返回true
    pub fn is_exhausted(&self, delivery_count: Option<u32>) -> bool {
        match delivery_count {
            Some(count) if self.max_redeliveries > 0 => count >= self.max_redeliveries,
            _ => false,
        }
    }
}

/// 确认策略
///
/// | 结果 | 决定 |
/// |---|---|
/// | accepted | ack |
/// | validation-failed | nack，不重新入队 |
/// | client-acquisition-failed | nack，重新入队 |
/// | submission-failed | nack，重新入队 |
///
/// 瞬时错误在投递次数达到上限后改为不重新入队，交给broker的死信配置处理。
#[derive(Debug, Clone, Copy, Default)]
pub struct AckPolicy {
    redelivery: RedeliveryPolicy,
}

impl AckPolicy {
    pub fn new(redelivery: RedeliveryPolicy) -> Self {
        Self { redelivery }
    }

    pub fn decide(&self, outcome: DispatchOutcome, delivery_count: Option<u32>) -> AckDecision {
        match outcome {
            DispatchOutcome::Accepted => AckDecision::Ack,
            DispatchOutcome::ValidationFailed => AckDecision::Nack { requeue: false },
            DispatchOutcome::ClientAcquisitionFailed | DispatchOutcome::SubmissionFailed => {
                if self.redelivery.is_exhausted(delivery_count) {
                    warn!(
                        outcome = %outcome,
                        delivery_count = ?delivery_count,
                        max_redeliveries = self.redelivery.max_redeliveries,
                        "重新投递次数已达上限，消息不再重新入队"
                    );
                    AckDecision::Nack { requeue: false }
                } else {
                    AckDecision::Nack { requeue: true }
                }
            }
        }
    }
}
