pub mod process;
pub mod settings;

pub use process::{ProcessConfig, QueueEndpoint};
pub use settings::{
    BrokerSettings, LogFormat, ObservabilitySettings, ServiceSettings, ShutdownSettings,
    WorkerSettings,
};
