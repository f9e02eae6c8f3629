use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error, info};

use adaptation_core::{AdaptationError, Acknowledger, InboundMessage, MessageSource, Result};

use crate::ack_policy::AckDecision;
use crate::pipeline::{MessageProcessor, ProcessingReport};

/// 消息消费循环
///
/// 严格按投递顺序逐条处理；关闭信号只在两条消息之间被观察到，
/// 正在处理的消息会完成分发和确认后循环才退出。
pub struct ConsumptionLoop {
    processor: MessageProcessor,
    acker: Arc<dyn Acknowledger>,
}

impl ConsumptionLoop {
    pub fn new(processor: MessageProcessor, acker: Arc<dyn Acknowledger>) -> Self {
        Self { processor, acker }
    }

    /// 运行直到收到关闭信号，返回已处理的消息数量
    ///
    /// 消息来源结束或出错时返回错误，由调用方决定进程退出。
    pub async fn run<S>(&self, source: &mut S, mut shutdown_rx: broadcast::Receiver<()>) -> Result<u64>
    where
        S: MessageSource + ?Sized,
    {
        info!("[*] 等待适配请求消息");
        let mut processed = 0u64;

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!(processed, "收到关闭信号，停止消费");
                    return Ok(processed);
                }
                next = source.next_message() => next,
            };

            match next {
                Some(Ok(message)) => {
                    self.handle_message(message).await;
                    processed += 1;
                }
                Some(Err(e)) => {
                    error!(error = %e, "接收消息失败");
                    return Err(e);
                }
                None => {
                    return Err(AdaptationError::MessageQueue(
                        "消费流已结束，broker连接可能已断开".to_string(),
                    ));
                }
            }
        }
    }

    async fn handle_message(&self, message: InboundMessage) -> ProcessingReport {
        let report = self.processor.process(&message).await;

        let result = match report.decision {
            AckDecision::Ack => self.acker.ack(message.delivery_tag).await,
            AckDecision::Nack { requeue } => self.acker.nack(message.delivery_tag, requeue).await,
        };

        match result {
            Ok(()) => debug!(
                delivery_tag = message.delivery_tag,
                outcome = %report.outcome,
                decision = ?report.decision,
                "消息已确认"
            ),
            Err(e) => error!(
                delivery_tag = message.delivery_tag,
                decision = ?report.decision,
                error = %e,
                "确认消息失败"
            ),
        }

        report
    }
}
