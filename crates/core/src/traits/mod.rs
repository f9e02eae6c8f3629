pub mod message_queue;
pub mod metrics;
pub mod orchestrator;

pub use message_queue::{Acknowledger, MessageSource};
pub use metrics::{MetricsRecorder, NoopMetricsRecorder};
pub use orchestrator::{ClusterClientFactory, WorkerLauncher};
