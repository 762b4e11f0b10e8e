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
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig, service_name: &str) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_common_metrics(service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册指标描述，出现在 /metrics 的 HELP 注释中
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "attendance_added_total",
        "Attendance rows inserted by the ledger"
    );
    metrics::describe_counter!(
        "attendance_removed_total",
        "Attendance rows deleted by the ledger"
    );
    metrics::describe_counter!(
        "ledger_points_delta_total",
        "Points added or deducted by the ledger"
    );
    metrics::describe_counter!("award_grants_total", "Awards granted by the ledger");
    metrics::describe_histogram!(
        "ledger_transaction_duration_seconds",
        "Ledger transaction duration in seconds"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
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
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
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

/// 记录一次账本事务
///
/// `operation` 取 add / remove / delete_event，`status` 取 success / failure。
#[inline]
pub fn record_ledger_transaction(operation: &'static str, status: &'static str, duration_secs: f64) {
    metrics::histogram!(
        "ledger_transaction_duration_seconds",
        "operation" => operation,
        "status" => status
    )
    .record(duration_secs);
}

/// 记录新增出勤
#[inline]
pub fn record_attendance_added(count: u64) {
    metrics::counter!("attendance_added_total").increment(count);
}

/// 记录删除出勤
#[inline]
pub fn record_attendance_removed(operation: &'static str, count: u64) {
    metrics::counter!("attendance_removed_total", "operation" => operation).increment(count);
}

/// 记录积分变动，按方向分别累计绝对值
#[inline]
pub fn record_points_delta(delta: i64) {
    let direction = if delta >= 0 { "credit" } else { "debit" };
    metrics::counter!("ledger_points_delta_total", "direction" => direction)
        .increment(delta.unsigned_abs());
}

/// 记录奖项授予
#[inline]
pub fn record_award_grants(count: u64) {
    metrics::counter!("award_grants_total").increment(count);
}
