//! 日志与指标初始化
//!
//! 日志走 tracing-subscriber，指标通过 metrics 门面写入 Prometheus 导出器。

pub mod metrics_collector;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use adaptation_core::config::LogFormat;

pub use metrics_collector::{
    PrometheusMetricsRecorder, MESSAGES_CONSUMED_TOTAL, MESSAGE_PROCESSING_TIME,
};

/// 处理耗时直方图的桶边界（毫秒）
pub const PROCESSING_TIME_BUCKETS: [f64; 6] = [5.0, 10.0, 100.0, 250.0, 500.0, 1000.0];

/// 初始化全局日志订阅者，`RUST_LOG` 优先于配置的级别
pub fn init_logging(log_level: &str, log_format: LogFormat) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
    }
    .context("初始化日志订阅者失败")?;

    info!(level = log_level, format = ?log_format, "日志系统初始化完成");
    Ok(())
}

/// 安装Prometheus导出器并在 `addr` 上提供 /metrics
///
/// 必须在tokio运行时内调用，导出器的HTTP监听任务由运行时承载。
pub fn init_metrics(addr: SocketAddr) -> Result<()> {
    prometheus_builder()?
        .with_http_listener(addr)
        .install()
        .context("安装Prometheus导出器失败")?;

    metrics_collector::describe_metrics();
    info!(%addr, "Prometheus指标导出器已启动");
    Ok(())
}

/// 带处理耗时直方图桶配置的导出器构造器
pub fn prometheus_builder() -> Result<PrometheusBuilder> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(MESSAGE_PROCESSING_TIME.to_string()),
            &PROCESSING_TIME_BUCKETS,
        )
        .context("设置直方图桶失败")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use adaptation_core::{DispatchOutcome, MetricsRecorder};

    use super::*;

    #[test]
    fn test_exported_metric_names_labels_and_buckets() {
        let recorder = prometheus_builder().unwrap().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            metrics_collector::describe_metrics();
            let collector = PrometheusMetricsRecorder::new();
            collector.record_processing_time(Duration::from_micros(1));
            collector.record_outcome(DispatchOutcome::ValidationFailed);
        });

        let rendered = handle.render();
        for le in ["5", "10", "100", "250", "500", "1000", "+Inf"] {
            let line = format!("message_processing_time_millisecond_bucket{{le=\"{le}\"}} 1");
            assert!(rendered.contains(&line), "missing {line} in:\n{rendered}");
        }
        assert!(rendered.contains("message_processing_time_millisecond_sum 0.001"));
        assert!(rendered.contains("message_processing_time_millisecond_count 1"));

        assert!(rendered.contains("messages_consumed_total{status=\"json_error\"} 1"));
        for status in ["ok", "k8s_client_error", "k8s_api_error"] {
            let line = format!("messages_consumed_total{{status=\"{status}\"}} 0");
            assert!(rendered.contains(&line), "missing {line} in:\n{rendered}");
        }
    }
}
