//! 健康检查模块
//!
//! 提供 /health、/ready 和 /metrics 端点

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::instances::{InstanceRegistry, InstanceStatus};
use crate::metrics::MetricsRecorder;

/// 健康检查状态
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub checks: Vec<ComponentHealth>,
}

/// 组件健康状态
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            checks: vec![],
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            status: "unhealthy".to_string(),
            checks: vec![],
        }
    }

    pub fn add_check(&mut self, check: ComponentHealth) {
        if check.status != "healthy" {
            self.status = "unhealthy".to_string();
        }
        self.checks.push(check);
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "healthy".to_string(),
            message: None,
        }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "unhealthy".to_string(),
            message: Some(message.into()),
        }
    }
}

/// 健康检查器
#[derive(Clone)]
pub struct HealthChecker {
    registry: InstanceRegistry,
}

impl HealthChecker {
    pub fn new(registry: InstanceRegistry) -> Self {
        Self { registry }
    }

    /// 执行存活检查（liveness）
    ///
    /// 只检查宿主进程是否在运行
    pub async fn liveness(&self) -> HealthStatus {
        HealthStatus::healthy()
    }

    /// 执行就绪检查（readiness）
    ///
    /// 至少放置了一个实例，且没有实例处于非健康状态
    pub async fn readiness(&self) -> HealthStatus {
        let instances = self.registry.snapshot().await;
        if instances.is_empty() {
            let mut status = HealthStatus::unhealthy();
            status.add_check(ComponentHealth::unhealthy(
                "instances",
                "No service instances placed",
            ));
            return status;
        }

        let mut status = HealthStatus::healthy();
        for instance in instances {
            let name = format!("{}/{}", instance.service_type, instance.instance_id);
            let check = if instance.status.is_healthy() {
                ComponentHealth::healthy(name)
            } else {
                ComponentHealth::unhealthy(name, status_message(instance.status))
            };
            status.add_check(check);
        }
        status
    }
}

fn status_message(status: InstanceStatus) -> &'static str {
    match status {
        InstanceStatus::Starting => "Instance is starting",
        InstanceStatus::Running => "Instance is running",
        InstanceStatus::Completed => "Instance completed",
        InstanceStatus::Failed => "Instance failed",
        InstanceStatus::Stopped => "Instance stopped",
    }
}

// ============================================================================
// HTTP 健康检查服务器
// ============================================================================

/// HTTP 健康检查服务器状态
#[derive(Clone)]
struct HealthServerState {
    checker: HealthChecker,
    metrics: Option<Arc<MetricsRecorder>>,
}

/// HTTP 健康检查服务器
pub struct HealthServer {
    checker: HealthChecker,
    metrics: Option<Arc<MetricsRecorder>>,
    port: u16,
}

impl HealthServer {
    /// 创建新的健康检查服务器
    pub fn new(
        registry: InstanceRegistry,
        metrics: Option<Arc<MetricsRecorder>>,
        port: u16,
    ) -> Self {
        Self {
            checker: HealthChecker::new(registry),
            metrics,
            port,
        }
    }

    /// 构建路由
    pub fn router(&self) -> Router {
        let state = HealthServerState {
            checker: self.checker.clone(),
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/ready", get(ready_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
    }

    /// 绑定监听端口
    ///
    /// 宿主在放置实例前调用，绑定失败直接终止启动
    pub async fn bind(&self) -> Result<TcpListener, std::io::Error> {
        TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], self.port))).await
    }

    /// 在已绑定的监听器上启动 HTTP 服务器，`shutdown` 取消后停止
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), std::io::Error> {
        let app = self.router();

        info!(addr = %listener.local_addr()?, "Health check HTTP server starting");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
    }
}

/// Liveness 端点处理器
async fn health_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    let status = state.checker.liveness().await;
    (StatusCode::OK, Json(status))
}

/// Readiness 端点处理器
async fn ready_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    let status = state.checker.readiness().await;
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

/// Metrics 端点处理器
async fn metrics_handler(State(state): State<HealthServerState>) -> Response {
    match state.metrics {
        Some(metrics) => (
            StatusCode::OK,
            [("content-type", "text/plain; charset=utf-8")],
            metrics.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
