use async_trait::async_trait;

use crate::errors::DispatchError;
use crate::models::{DispatchRequest, WorkerHandle};

/// 集群编排客户端工厂
///
/// 每次分发都会重新获取客户端，失败归类为 [`DispatchError::ClientAcquisition`]。
#[async_trait]
pub trait ClusterClientFactory: Send + Sync {
    async fn connect(&self, namespace: &str) -> Result<Box<dyn WorkerLauncher>, DispatchError>;
}

/// 在集群中启动工作Pod
#[async_trait]
pub trait WorkerLauncher: Send + Sync {
    /// 提交创建请求，失败归类为 [`DispatchError::Submission`]
    async fn launch(&self, request: &DispatchRequest) -> Result<WorkerHandle, DispatchError>;
}
