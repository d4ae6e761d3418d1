//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::ObservabilityConfig;

/// Metrics 资源守卫
pub struct MetricsHandle {
    server_handle: tokio::task::JoinHandle<()>,
}

impl MetricsHandle {
    pub(crate) fn shutdown(self) {
        self.server_handle.abort();
    }
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig, service_name: &str) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_metrics();
    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle { server_handle })
}

/// 描述本服务的指标，出现在 /metrics 的 HELP 注释中
fn describe_metrics() {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "notifications_ingested_total",
        "Total number of notification records persisted from bus events"
    );
    metrics::describe_counter!(
        "notification_ingest_failures_total",
        "Total number of bus events that could not be ingested"
    );
    metrics::describe_counter!(
        "notification_render_failures_total",
        "Total number of stored records skipped because they could not be rendered"
    );
    metrics::describe_counter!(
        "ingestion_restarts_total",
        "Total number of subscription restarts after a transport failure"
    );
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("指标服务监听于 {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("指标服务异常退出: {}", e);
        }
    });

    Ok(server_handle)
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录一次事件摄取成功，count 为写入的记录数（扇出时大于 1）
#[inline]
pub fn record_ingested(kind: &str, count: usize) {
    metrics::counter!("notifications_ingested_total", "kind" => kind.to_string())
        .increment(count as u64);
}

/// 记录一次事件摄取失败
///
/// reason 取 decode / validation / persistence 之一。
#[inline]
pub fn record_ingest_failure(kind: &str, reason: &str) {
    metrics::counter!(
        "notification_ingest_failures_total",
        "kind" => kind.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// 记录一条因无法渲染而被跳过的记录
#[inline]
pub fn record_render_failure(kind: &str) {
    metrics::counter!("notification_render_failures_total", "kind" => kind.to_string())
        .increment(1);
}

/// 记录一次订阅重启
#[inline]
pub fn record_restart(kind: &str) {
    metrics::counter!("ingestion_restarts_total", "kind" => kind.to_string()).increment(1);
}
