use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use adaptation_core::config::LogFormat;
use adaptation_core::{ProcessConfig, ServiceSettings};
use adaptation_infrastructure::observability::{init_logging, init_metrics};

mod app;
mod shutdown;

use app::{connect_with_process_config, Application};
use shutdown::ShutdownManager;

#[derive(Debug, Parser)]
#[command(name = "adaptation-service", version, about = "文件适配请求分发服务")]
struct Cli {
    /// 配置文件路径，不指定时只使用默认值和环境变量
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long, value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error"])]
    log_level: Option<String>,

    /// 日志格式，覆盖配置文件
    #[arg(long, value_name = "FORMAT", value_parser = ["json", "pretty", "compact"])]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = ServiceSettings::load(cli.config.as_deref()).context("加载服务配置失败")?;
    if let Some(level) = cli.log_level {
        settings.observability.log_level = level;
    }
    if let Some(format) = cli.log_format {
        settings.observability.log_format = format.parse::<LogFormat>()?;
    }

    init_logging(
        &settings.observability.log_level,
        settings.observability.log_format,
    )?;

    info!("启动适配请求分发服务");
    if let Some(path) = &cli.config {
        info!("配置文件: {path}");
    }

    let shutdown_timeout = Duration::from_secs(settings.shutdown.timeout_seconds);
    let app = connect_with_process_config(ProcessConfig::from_env, |process_config| async move {
        if settings.observability.metrics_enabled {
            init_metrics(settings.observability.metrics_socket_addr()?)?;
        }
        Application::new(settings, process_config).await
    })
    .await?;
    let app = Arc::new(app);

    let shutdown_manager = ShutdownManager::new();
    let shutdown_rx = shutdown_manager.subscribe().await;
    let mut app_handle = {
        let app = Arc::clone(&app);
        tokio::spawn(async move { app.run(shutdown_rx).await })
    };

    let run_result = tokio::select! {
        _ = wait_for_shutdown_signal() => {
            info!("收到关闭信号，开始优雅关闭...");
            shutdown_manager.shutdown().await;

            match tokio::time::timeout(shutdown_timeout, &mut app_handle).await {
                Ok(joined) => joined.context("消费任务异常终止")?,
                Err(_) => {
                    warn!("等待消费循环退出超时，强制退出");
                    app_handle.abort();
                    Ok(0)
                }
            }
        }
        joined = &mut app_handle => joined.context("消费任务异常终止")?,
    };

    if let Err(e) = app.stop().await {
        warn!("关闭broker连接失败: {e:#}");
    }

    match run_result {
        Ok(processed) => {
            info!(processed, "适配请求分发服务已退出");
            Ok(())
        }
        Err(e) => {
            error!("消费循环失败: {e:#}");
            Err(e)
        }
    }
}

/// 等待SIGINT或SIGTERM
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("安装Ctrl+C信号处理器失败: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("安装SIGTERM信号处理器失败: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}
