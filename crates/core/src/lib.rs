pub mod config;
pub mod errors;
pub mod models;
pub mod traits;

pub use crate::config::{ProcessConfig, QueueEndpoint, ServiceSettings};
pub use crate::errors::{AdaptationError, ConfigError, DispatchError, Result, ValidationError};
pub use crate::models::{
    AdaptationFields, DispatchOutcome, DispatchRequest, HeaderValue, InboundMessage, WorkerHandle,
};
pub use crate::traits::{
    Acknowledger, ClusterClientFactory, MessageSource, MetricsRecorder, NoopMetricsRecorder,
    WorkerLauncher,
};

/// 交换机名称
pub const EXCHANGE_NAME: &str = "adaptation-exchange";
/// 适配请求队列名称
pub const QUEUE_NAME: &str = "adaptation-request-queue";
/// 路由键
pub const ROUTING_KEY: &str = "adaptation-request";
