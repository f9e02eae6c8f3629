//! 工作Pod清单构造
//!
//! 每个分发请求对应一个 `restartPolicy: Never` 的Pod，容器通过环境变量拿到
//! 文件位置和回传队列地址，输入输出目录通过PVC挂载。

use std::collections::BTreeMap;

use chrono::Utc;
use k8s_openapi::api::core::v1::{
    Container, EnvVar, PersistentVolumeClaimVolumeSource, Pod, PodSpec,
    ResourceRequirements, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use uuid::Uuid;

use adaptation_core::config::WorkerSettings;
use adaptation_core::DispatchRequest;

pub const CONTAINER_NAME: &str = "request-processing";
const SOURCE_VOLUME: &str = "sourcedir";
const TARGET_VOLUME: &str = "targetdir";
const FILE_ID_ANNOTATION: &str = "adaptation.service/file-id";
const CREATED_AT_ANNOTATION: &str = "adaptation.service/created-at";

#[derive(Debug, Clone)]
pub struct PodSpecFactory {
    settings: WorkerSettings,
}

impl PodSpecFactory {
    pub fn new(settings: WorkerSettings) -> Self {
        Self { settings }
    }

    pub fn pod_name(&self) -> String {
        format!("{}-{}", self.settings.pod_name_prefix, Uuid::new_v4())
    }

    pub fn build(&self, request: &DispatchRequest) -> Pod {
        let labels = BTreeMap::from([("app".to_string(), self.settings.pod_name_prefix.clone())]);
        let annotations = BTreeMap::from([
            (FILE_ID_ANNOTATION.to_string(), request.file_id.clone()),
            (CREATED_AT_ANNOTATION.to_string(), Utc::now().to_rfc3339()),
        ]);

        Pod {
            metadata: ObjectMeta {
                name: Some(self.pod_name()),
                namespace: Some(request.namespace().to_string()),
                labels: Some(labels),
                annotations: Some(annotations),
                ..Default::default()
            },
            spec: Some(PodSpec {
                restart_policy: Some("Never".to_string()),
                service_account_name: self.settings.service_account.clone(),
                volumes: Some(vec![
                    claim_volume(SOURCE_VOLUME, &self.settings.input_claim_name),
                    claim_volume(TARGET_VOLUME, &self.settings.output_claim_name),
                ]),
                containers: vec![self.build_container(request)],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn build_container(&self, request: &DispatchRequest) -> Container {
        let config = &request.config;

        Container {
            name: CONTAINER_NAME.to_string(),
            image: Some(config.request_processing_image.clone()),
            env: Some(build_env(request)),
            resources: Some(build_resources(request)),
            volume_mounts: Some(vec![
                VolumeMount {
                    name: SOURCE_VOLUME.to_string(),
                    mount_path: config.input_mount.clone(),
                    ..Default::default()
                },
                VolumeMount {
                    name: TARGET_VOLUME.to_string(),
                    mount_path: config.output_mount.clone(),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        }
    }
}

fn claim_volume(name: &str, claim_name: &str) -> Volume {
    Volume {
        name: name.to_string(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name: claim_name.to_string(),
            read_only: None,
        }),
        ..Default::default()
    }
}

fn build_resources(request: &DispatchRequest) -> ResourceRequirements {
    let config = &request.config;
    let requests = BTreeMap::from([
        ("cpu".to_string(), Quantity(config.cpu_request.clone())),
        ("memory".to_string(), Quantity(config.memory_request.clone())),
    ]);
    let limits = BTreeMap::from([
        ("cpu".to_string(), Quantity(config.cpu_limit.clone())),
        ("memory".to_string(), Quantity(config.memory_limit.clone())),
    ]);

    ResourceRequirements {
        requests: Some(requests),
        limits: Some(limits),
        ..Default::default()
    }
}

fn build_env(request: &DispatchRequest) -> Vec<EnvVar> {
    let config = &request.config;
    let vars = [
        ("FILE_ID", request.file_id.clone()),
        ("INPUT_PATH", request.source_file_location.clone()),
        ("OUTPUT_PATH", request.rebuilt_file_location.clone()),
        ("GENERATE_REPORT", request.generate_report.clone()),
        ("REPLY_TO", request.reply_to.clone().unwrap_or_default()),
        (
            "REQUEST_PROCESSING_TIMEOUT",
            config.request_processing_timeout.clone(),
        ),
        (
            "ADAPTATION_REQUEST_QUEUE_HOSTNAME",
            config.adaptation_request_queue.hostname.clone(),
        ),
        (
            "ADAPTATION_REQUEST_QUEUE_PORT",
            config.adaptation_request_queue.port.to_string(),
        ),
        (
            "ARCHIVE_ADAPTATION_REQUEST_QUEUE_HOSTNAME",
            config.archive_adaptation_request_queue.hostname.clone(),
        ),
        (
            "ARCHIVE_ADAPTATION_REQUEST_QUEUE_PORT",
            config.archive_adaptation_request_queue.port.to_string(),
        ),
        (
            "TRANSACTION_EVENT_QUEUE_HOSTNAME",
            config.transaction_event_queue.hostname.clone(),
        ),
        (
            "TRANSACTION_EVENT_QUEUE_PORT",
            config.transaction_event_queue.port.to_string(),
        ),
        ("MESSAGE_BROKER_USER", config.message_broker_user.clone()),
        ("MESSAGE_BROKER_PASSWORD", config.message_broker_password.clone()),
    ];

    vars.into_iter()
        .map(|(name, value)| EnvVar {
            name: name.to_string(),
            value: Some(value),
            ..Default::default()
        })
        .collect()
}
