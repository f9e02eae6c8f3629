use thiserror::Error;

use crate::models::DispatchOutcome;

/// 适配服务错误类型定义
#[derive(Debug, Error)]
pub enum AdaptationError {
    #[error("配置错误: {0}")]
    Configuration(#[from] ConfigError),

    #[error("消息队列错误: {0}")]
    MessageQueue(String),
}

/// 统一的Result类型
pub type Result<T> = std::result::Result<T, AdaptationError>;

/// 启动阶段的配置错误，任何一个都会终止进程
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("init failed: {message} (缺失: {})", missing.join(", "))]
    MissingCluster {
        message: String,
        missing: Vec<String>,
    },

    #[error("无效的端口 {key}={value}")]
    InvalidPort { key: String, value: String },

    #[error("无效的配置项 {key}: {message}")]
    InvalidSetting { key: String, message: String },

    #[error("加载服务配置失败: {0}")]
    Load(String),
}

/// 消息头校验错误，永远不可重试
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("消息头缺失: {key}")]
    MissingHeader { key: &'static str },

    #[error("消息头 {key} 类型错误: 期望字符串，实际为 {found}")]
    WrongType { key: &'static str, found: String },
}

/// 分发阶段的错误，两类都属于瞬时错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("获取集群客户端失败: {0}")]
    ClientAcquisition(String),

    #[error("创建工作Pod失败: {0}")]
    Submission(String),
}

impl DispatchError {
    pub fn outcome(&self) -> DispatchOutcome {
        match self {
            DispatchError::ClientAcquisition(_) => DispatchOutcome::ClientAcquisitionFailed,
            DispatchError::Submission(_) => DispatchOutcome::SubmissionFailed,
        }
    }
}
