//! 适配请求分发
//!
//! 校验消息头、构造分发请求、提交工作Pod、决定消息确认方式，并按顺序消费消息。

pub mod ack_policy;
pub mod consumer;
pub mod coordinator;
pub mod pipeline;
pub mod redelivery;
pub mod validator;

pub use ack_policy::{AckDecision, AckPolicy, RedeliveryPolicy};
pub use consumer::ConsumptionLoop;
pub use coordinator::DispatchCoordinator;
pub use pipeline::{MessageProcessor, ProcessingReport};
pub use redelivery::RedeliveryTracker;
pub use validator::extract_fields;
