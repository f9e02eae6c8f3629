use async_trait::async_trait;

use crate::{models::InboundMessage, Result};

/// 入站消息来源
///
/// 返回 `None` 表示broker侧的消费流已经结束（例如连接断开）。
#[async_trait]
pub trait MessageSource: Send {
    async fn next_message(&mut self) -> Option<Result<InboundMessage>>;
}

/// 消息确认接口，按投递标签确认或拒绝
#[async_trait]
pub trait Acknowledger: Send + Sync {
    /// 确认消息处理完成
    async fn ack(&self, delivery_tag: u64) -> Result<()>;

    /// 拒绝消息，`requeue` 决定是否重新入队
    async fn nack(&self, delivery_tag: u64, requeue: bool) -> Result<()>;
}
