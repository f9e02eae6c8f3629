//! Kubernetes集群编排客户端
//!
//! 每次分发都通过 `Client::try_default` 重新推断配置（集群内ServiceAccount或kubeconfig）。

pub mod pod_spec;

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{Api, PostParams},
    Client,
};
use tracing::debug;

use adaptation_core::config::WorkerSettings;
use adaptation_core::{
    ClusterClientFactory, DispatchError, DispatchRequest, WorkerHandle, WorkerLauncher,
};

pub use pod_spec::PodSpecFactory;

pub struct KubernetesClientFactory {
    pod_specs: Arc<PodSpecFactory>,
}

impl KubernetesClientFactory {
    pub fn new(settings: WorkerSettings) -> Self {
        Self {
            pod_specs: Arc::new(PodSpecFactory::new(settings)),
        }
    }
}

#[async_trait]
impl ClusterClientFactory for KubernetesClientFactory {
    async fn connect(&self, namespace: &str) -> Result<Box<dyn WorkerLauncher>, DispatchError> {
        let client = Client::try_default()
            .await
            .map_err(|e| DispatchError::ClientAcquisition(e.to_string()))?;

        Ok(Box::new(KubernetesWorkerLauncher {
            pods: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
            pod_specs: Arc::clone(&self.pod_specs),
        }))
    }
}

pub struct KubernetesWorkerLauncher {
    pods: Api<Pod>,
    namespace: String,
    pod_specs: Arc<PodSpecFactory>,
}

#[async_trait]
impl WorkerLauncher for KubernetesWorkerLauncher {
    async fn launch(&self, request: &DispatchRequest) -> Result<WorkerHandle, DispatchError> {
        let pod = self.pod_specs.build(request);
        let pod_name = pod.metadata.name.clone().unwrap_or_default();
        debug!(pod = %pod_name, namespace = %self.namespace, "提交工作Pod");

        let created = self
            .pods
            .create(&PostParams::default(), &pod)
            .await
            .map_err(|e| DispatchError::Submission(format!("Pod {pod_name}: {e}")))?;

        Ok(WorkerHandle {
            pod_name: created.metadata.name.unwrap_or(pod_name),
            namespace: self.namespace.clone(),
        })
    }
}
