use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

/// 优雅关闭管理器
///
/// 消费循环订阅关闭信号，只在两条消息之间检查，所以触发关闭不会打断正在进行的分发。
#[derive(Clone)]
pub struct ShutdownManager {
    shutdown_tx: Arc<RwLock<Option<broadcast::Sender<()>>>>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);

        Self {
            shutdown_tx: Arc::new(RwLock::new(Some(shutdown_tx))),
        }
    }

    /// 订阅关闭信号，关闭之后订阅会立即收到信号
    pub async fn subscribe(&self) -> broadcast::Receiver<()> {
        let shutdown_tx = self.shutdown_tx.read().await;
        match shutdown_tx.as_ref() {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = broadcast::channel(1);
                let _ = tx.send(());
                rx
            }
        }
    }

    /// 触发关闭，重复调用无效果
    pub async fn shutdown(&self) {
        let mut shutdown_tx = self.shutdown_tx.write().await;
        let Some(tx) = shutdown_tx.take() else {
            debug!("关闭管理器已经触发过关闭");
            return;
        };

        debug!("发送关闭信号给 {} 个订阅者", tx.receiver_count());
        // 没有订阅者时发送失败，可以忽略
        let _ = tx.send(());
        info!("关闭信号已发送");
    }

    pub async fn is_shutdown(&self) -> bool {
        self.shutdown_tx.read().await.is_none()
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_subscribers_receive_shutdown() {
        let manager = ShutdownManager::new();
        let mut first = manager.subscribe().await;
        let mut second = manager.clone().subscribe().await;

        assert!(!manager.is_shutdown().await);
        manager.shutdown().await;

        assert!(first.recv().await.is_ok());
        assert!(second.recv().await.is_ok());
        assert!(manager.is_shutdown().await);
    }

    #[tokio::test]
    async fn test_late_subscriber_is_signalled_immediately() {
        let manager = ShutdownManager::new();
        manager.shutdown().await;
        manager.shutdown().await;

        let mut late = manager.subscribe().await;
        let received = timeout(Duration::from_secs(1), late.recv()).await;
        assert!(matches!(received, Ok(Ok(()))));
    }
}
