//! Test data builders for messages and configuration

use std::collections::HashMap;
use std::sync::Arc;

use adaptation_core::config::process::*;
use adaptation_core::models::{
    HEADER_DELIVERY_COUNT, HEADER_FILE_ID, HEADER_GENERATE_REPORT, HEADER_REBUILT_FILE_LOCATION,
    HEADER_SOURCE_FILE_LOCATION,
};
use adaptation_core::{HeaderValue, InboundMessage, ProcessConfig};

/// 一组完整的进程环境变量
pub fn test_process_vars() -> HashMap<String, String> {
    [
        (POD_NAMESPACE, "icap-adaptation"),
        (INPUT_MOUNT, "/var/source"),
        (OUTPUT_MOUNT, "/var/target"),
        (REQUEST_PROCESSING_IMAGE, "registry.local/rebuild:1.0"),
        (REQUEST_PROCESSING_TIMEOUT, "60s"),
        (ADAPTATION_REQUEST_QUEUE_HOSTNAME, "rabbitmq-service"),
        (ADAPTATION_REQUEST_QUEUE_PORT, "5672"),
        (ARCHIVE_ADAPTATION_REQUEST_QUEUE_HOSTNAME, "archive-rabbitmq"),
        (ARCHIVE_ADAPTATION_REQUEST_QUEUE_PORT, "5672"),
        (TRANSACTION_EVENT_QUEUE_HOSTNAME, "transaction-rabbitmq"),
        (TRANSACTION_EVENT_QUEUE_PORT, "5672"),
        (CPU_LIMIT, "1"),
        (CPU_REQUEST, "0.25"),
        (MEMORY_LIMIT, "10000Mi"),
        (MEMORY_REQUEST, "250Mi"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn test_process_config() -> Arc<ProcessConfig> {
    match ProcessConfig::from_vars(&test_process_vars()) {
        Ok(config) => Arc::new(config),
        Err(e) => panic!("test process vars must be valid: {e}"),
    }
}

/// Builder for creating test InboundMessage values
pub struct MessageBuilder {
    message: InboundMessage,
}

impl MessageBuilder {
    pub fn new(delivery_tag: u64) -> Self {
        Self {
            message: InboundMessage::new(delivery_tag),
        }
    }

    /// 带齐三个必需消息头的消息
    pub fn valid(delivery_tag: u64, file_id: &str) -> Self {
        Self::new(delivery_tag)
            .with_file_id(file_id)
            .with_source_file_location(&format!("/in/{file_id}"))
            .with_rebuilt_file_location(&format!("/out/{file_id}"))
    }

    pub fn with_header(mut self, key: &str, value: impl Into<HeaderValue>) -> Self {
        self.message.headers.insert(key.to_string(), value.into());
        self
    }

    pub fn without_header(mut self, key: &str) -> Self {
        self.message.headers.remove(key);
        self
    }

    pub fn with_file_id(self, file_id: &str) -> Self {
        self.with_header(HEADER_FILE_ID, file_id)
    }

    pub fn with_source_file_location(self, location: &str) -> Self {
        self.with_header(HEADER_SOURCE_FILE_LOCATION, location)
    }

    pub fn with_rebuilt_file_location(self, location: &str) -> Self {
        self.with_header(HEADER_REBUILT_FILE_LOCATION, location)
    }

    pub fn with_generate_report(self, generate_report: &str) -> Self {
        self.with_header(HEADER_GENERATE_REPORT, generate_report)
    }

    pub fn with_delivery_count(self, count: i64) -> Self {
        self.with_header(HEADER_DELIVERY_COUNT, count)
    }

    pub fn with_reply_to(mut self, reply_to: &str) -> Self {
        self.message.reply_to = Some(reply_to.to_string());
        self
    }

    pub fn redelivered(mut self) -> Self {
        self.message.redelivered = true;
        self
    }

    pub fn build(self) -> InboundMessage {
        self.message
    }
}
