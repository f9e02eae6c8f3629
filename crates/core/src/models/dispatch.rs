use std::fmt;
use std::sync::Arc;

use crate::config::ProcessConfig;

/// 未携带generate-report消息头时使用的值
pub const DEFAULT_GENERATE_REPORT: &str = "false";

/// 从消息头中提取出的单条请求字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptationFields {
    pub file_id: String,
    pub source_file_location: String,
    pub rebuilt_file_location: String,
    pub generate_report: String,
}

/// 提交给集群编排客户端的分发请求
///
/// 每条消息构造一次，分发结束后即丢弃。
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub config: Arc<ProcessConfig>,
    pub file_id: String,
    pub source_file_location: String,
    pub rebuilt_file_location: String,
    pub generate_report: String,
    pub reply_to: Option<String>,
}

impl DispatchRequest {
    pub fn new(config: Arc<ProcessConfig>, fields: AdaptationFields, reply_to: Option<String>) -> Self {
        Self {
            config,
            file_id: fields.file_id,
            source_file_location: fields.source_file_location,
            rebuilt_file_location: fields.rebuilt_file_location,
            generate_report: fields.generate_report,
            reply_to,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.config.pod_namespace
    }
}

/// 已提交的工作Pod
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerHandle {
    pub pod_name: String,
    pub namespace: String,
}

/// 单条消息的处理结果，同时决定确认方式和指标标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchOutcome {
    Accepted,
    ValidationFailed,
    ClientAcquisitionFailed,
    SubmissionFailed,
}

impl DispatchOutcome {
    pub const ALL: [DispatchOutcome; 4] = [
        DispatchOutcome::Accepted,
        DispatchOutcome::ValidationFailed,
        DispatchOutcome::ClientAcquisitionFailed,
        DispatchOutcome::SubmissionFailed,
    ];

    /// messages_consumed_total 的 status 标签
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Accepted => "ok",
            DispatchOutcome::ValidationFailed => "json_error",
            DispatchOutcome::ClientAcquisitionFailed => "k8s_client_error",
            DispatchOutcome::SubmissionFailed => "k8s_api_error",
        }
    }

    /// 是否属于可以通过重新投递恢复的瞬时错误
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DispatchOutcome::ClientAcquisitionFailed | DispatchOutcome::SubmissionFailed
        )
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
