use std::sync::Arc;

use tracing::{debug, info};

use adaptation_core::{
    AdaptationFields, ClusterClientFactory, DispatchError, DispatchRequest, ProcessConfig,
    WorkerHandle,
};

/// 分发协调器
///
/// 合并进程配置与消息字段构造分发请求，然后依次获取集群客户端、提交工作Pod。
/// 提交部分成功（Pod已创建但确认失败）时不做任何补偿。
pub struct DispatchCoordinator {
    config: Arc<ProcessConfig>,
    clients: Arc<dyn ClusterClientFactory>,
}

impl DispatchCoordinator {
    pub fn new(config: Arc<ProcessConfig>, clients: Arc<dyn ClusterClientFactory>) -> Self {
        Self { config, clients }
    }

    pub fn build_request(&self, fields: AdaptationFields, reply_to: Option<String>) -> DispatchRequest {
        DispatchRequest::new(Arc::clone(&self.config), fields, reply_to)
    }

    pub async fn dispatch(
        &self,
        fields: AdaptationFields,
        reply_to: Option<String>,
    ) -> Result<WorkerHandle, DispatchError> {
        let request = self.build_request(fields, reply_to);

        let launcher = self.clients.connect(request.namespace()).await?;
        debug!(namespace = request.namespace(), "已获取集群客户端");

        let handle = launcher.launch(&request).await?;
        info!(
            file_id = %request.file_id,
            pod = %handle.pod_name,
            namespace = %handle.namespace,
            "工作Pod已提交"
        );

        Ok(handle)
    }
}
