use std::net::SocketAddr;
use std::path::Path;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(ConfigError::InvalidSetting {
                key: "observability.log_format".to_string(),
                message: format!("不支持的日志格式: {s}"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilitySettings {
    pub log_level: String,
    pub log_format: LogFormat,
    pub metrics_enabled: bool,
    pub metrics_bind_address: String,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_bind_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl ObservabilitySettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(invalid(
                "observability.log_level",
                format!("不支持的日志级别: {}", self.log_level),
            ));
        }

        if self.metrics_enabled {
            self.metrics_socket_addr()?;
        }

        Ok(())
    }

    pub fn metrics_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.metrics_bind_address.parse().map_err(|e| {
            invalid(
                "observability.metrics_bind_address",
                format!("{}: {e}", self.metrics_bind_address),
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    pub prefetch_count: u16,
    pub consumer_tag: String,
    /// 瞬时错误的最大投递次数，0表示不限制
    pub max_redeliveries: u32,
    pub dead_letter_exchange: Option<String>,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            prefetch_count: 1,
            consumer_tag: "adaptation-service".to_string(),
            max_redeliveries: 10,
            dead_letter_exchange: None,
        }
    }
}

impl BrokerSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefetch_count == 0 {
            return Err(invalid("broker.prefetch_count", "预取数量必须大于0"));
        }

        if self.consumer_tag.is_empty() {
            return Err(invalid("broker.consumer_tag", "消费者标签不能为空"));
        }

        if matches!(&self.dead_letter_exchange, Some(exchange) if exchange.is_empty()) {
            return Err(invalid("broker.dead_letter_exchange", "死信交换机名称不能为空"));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    pub pod_name_prefix: String,
    pub input_claim_name: String,
    pub output_claim_name: String,
    pub service_account: Option<String>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            pod_name_prefix: "rebuild".to_string(),
            input_claim_name: "adaptation-source-pvc".to_string(),
            output_claim_name: "adaptation-target-pvc".to_string(),
            service_account: None,
        }
    }
}

impl WorkerSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // pod名称后面还要拼接36位的uuid
        let prefix_ok = !self.pod_name_prefix.is_empty()
            && self.pod_name_prefix.len() <= 26
            && self
                .pod_name_prefix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !prefix_ok {
            return Err(invalid(
                "worker.pod_name_prefix",
                format!("无效的Pod名称前缀: {}", self.pod_name_prefix),
            ));
        }

        if self.input_claim_name.is_empty() || self.output_claim_name.is_empty() {
            return Err(invalid("worker.input_claim_name", "PVC名称不能为空"));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownSettings {
    pub timeout_seconds: u64,
}

impl Default for ShutdownSettings {
    fn default() -> Self {
        Self { timeout_seconds: 30 }
    }
}

/// 服务运行参数
///
/// 与 [`super::ProcessConfig`] 不同，这些参数不会传给工作Pod，只影响分发服务本身。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceSettings {
    pub observability: ObservabilitySettings,
    pub broker: BrokerSettings,
    pub worker: WorkerSettings,
    pub shutdown: ShutdownSettings,
}

impl ServiceSettings {
    /// 依次叠加默认值、可选的TOML文件和 `ADAPTATION_` 前缀的环境变量
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mut builder = ConfigBuilder::builder()
            .set_default("observability.log_level", defaults.observability.log_level)
            .and_then(|b| b.set_default("observability.log_format", "pretty"))
            .and_then(|b| b.set_default("observability.metrics_enabled", true))
            .and_then(|b| {
                b.set_default(
                    "observability.metrics_bind_address",
                    defaults.observability.metrics_bind_address,
                )
            })
            .and_then(|b| {
                b.set_default("broker.prefetch_count", defaults.broker.prefetch_count as i64)
            })
            .and_then(|b| b.set_default("broker.consumer_tag", defaults.broker.consumer_tag))
            .and_then(|b| {
                b.set_default("broker.max_redeliveries", defaults.broker.max_redeliveries as i64)
            })
            .and_then(|b| b.set_default("worker.pod_name_prefix", defaults.worker.pod_name_prefix))
            .and_then(|b| b.set_default("worker.input_claim_name", defaults.worker.input_claim_name))
            .and_then(|b| {
                b.set_default("worker.output_claim_name", defaults.worker.output_claim_name)
            })
            .and_then(|b| {
                b.set_default("shutdown.timeout_seconds", defaults.shutdown.timeout_seconds as i64)
            })
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        if let Some(path) = config_path {
            if !Path::new(path).exists() {
                return Err(ConfigError::Load(format!("配置文件不存在: {path}")));
            }
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("ADAPTATION")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: ServiceSettings = builder
            .build()
            .map_err(|e| ConfigError::Load(format!("构建配置失败: {e}")))?
            .try_deserialize()
            .map_err(|e| ConfigError::Load(format!("反序列化配置失败: {e}")))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let settings: ServiceSettings = toml::from_str(toml_str)
            .map_err(|e| ConfigError::Load(format!("解析TOML配置失败: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.observability.validate()?;
        self.broker.validate()?;
        self.worker.validate()?;
        Ok(())
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidSetting {
        key: key.to_string(),
        message: message.into(),
    }
}
