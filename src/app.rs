use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, info};

use adaptation_core::{
    ConfigError, MetricsRecorder, NoopMetricsRecorder, ProcessConfig, ServiceSettings,
};
use adaptation_dispatcher::{
    AckPolicy, ConsumptionLoop, DispatchCoordinator, MessageProcessor, RedeliveryPolicy,
};
use adaptation_infrastructure::{
    KubernetesClientFactory, PrometheusMetricsRecorder, RabbitMQTopology,
};

/// 分发服务：一个broker连接、一个消费循环
pub struct Application {
    settings: ServiceSettings,
    process_config: Arc<ProcessConfig>,
    topology: RabbitMQTopology,
}

impl Application {
    /// 连接broker并声明拓扑
    pub async fn new(settings: ServiceSettings, process_config: ProcessConfig) -> Result<Self> {
        let url = process_config.amqp_url().context("构造broker地址失败")?;

        info!(
            broker = %process_config.adaptation_request_queue.authority(),
            "连接消息队列"
        );
        let topology = RabbitMQTopology::connect(&url, &settings.broker)
            .await
            .with_context(|| {
                format!(
                    "连接 {} 失败",
                    process_config.adaptation_request_queue.authority()
                )
            })?;

        Ok(Self {
            settings,
            process_config: Arc::new(process_config),
            topology,
        })
    }

    /// 消费直到收到关闭信号，返回处理的消息数量
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<u64> {
        let mut source = self
            .topology
            .consume(&self.settings.broker.consumer_tag)
            .await
            .context("注册消费者失败")?;

        let processed = self
            .consumption_loop()
            .run(&mut source, shutdown_rx)
            .await
            .context("消费循环异常退出")?;

        Ok(processed)
    }

    /// 关闭broker连接
    pub async fn stop(&self) -> Result<()> {
        if self.topology.is_connected() {
            self.topology.close().await.context("关闭broker连接失败")?;
        }
        Ok(())
    }

    fn consumption_loop(&self) -> ConsumptionLoop {
        let metrics: Arc<dyn MetricsRecorder> = if self.settings.observability.metrics_enabled {
            Arc::new(PrometheusMetricsRecorder::new())
        } else {
            Arc::new(NoopMetricsRecorder)
        };

        let coordinator = DispatchCoordinator::new(
            Arc::clone(&self.process_config),
            Arc::new(KubernetesClientFactory::new(self.settings.worker.clone())),
        );
        let policy = AckPolicy::new(RedeliveryPolicy {
            max_redeliveries: self.settings.broker.max_redeliveries,
        });

        ConsumptionLoop::new(
            MessageProcessor::new(coordinator, metrics, policy),
            Arc::new(self.topology.acknowledger()),
        )
    }
}

/// 先解析进程配置，完整之后才调用 `connect` 连接broker
///
/// 配置不完整时直接返回错误，不会声明任何broker拓扑。
pub async fn connect_with_process_config<T, R, C, Fut>(resolve: R, connect: C) -> Result<T>
where
    R: FnOnce() -> std::result::Result<ProcessConfig, ConfigError>,
    C: FnOnce(ProcessConfig) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let process_config = match resolve() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "进程配置不完整，服务无法启动");
            return Err(e.into());
        }
    };
    info!(config = ?process_config, "进程配置加载完成");

    connect(process_config).await
}
