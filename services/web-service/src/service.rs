//! Web 无状态服务

use std::sync::Arc;

use async_trait::async_trait;
use insight_bootstrap::{CancellationToken, ServiceContext, StatelessService};
use insight_errors::{AppError, AppResult};
use tokio::net::TcpListener;
use tracing::info;

use crate::api::{router, AppState};
use crate::query::InMemoryDeviceStore;

/// Web 服务实例
///
/// 在宿主分配的地址上提供设备 API，直到收到关闭信号
pub struct WebService {
    context: ServiceContext,
    store: Arc<InMemoryDeviceStore>,
}

impl WebService {
    pub fn new(context: ServiceContext, store: Arc<InMemoryDeviceStore>) -> Self {
        Self { context, store }
    }

    pub fn context(&self) -> &ServiceContext {
        &self.context
    }

    fn app_state(&self) -> AppState {
        AppState {
            devices: self.store.clone(),
            sightings: self.store.clone(),
            service_type: self.context.service_type().to_string(),
            instance_id: self.context.instance_id(),
        }
    }
}

#[async_trait]
impl StatelessService for WebService {
    async fn run(&self, shutdown: CancellationToken) -> AppResult<()> {
        let endpoint = self.context.endpoint();
        let listener = TcpListener::bind(endpoint).await.map_err(|e| {
            AppError::unavailable(format!("Failed to bind {}: {}", endpoint, e))
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| AppError::internal(format!("Failed to read local address: {}", e)))?;

        info!(
            service_type = %self.context.service_type(),
            instance_id = %self.context.instance_id(),
            addr = %local_addr,
            "Web service listening"
        );
        self.context.report_ready().await;

        axum::serve(listener, router(self.app_state()))
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(|e| AppError::internal(format!("Web server error: {}", e)))?;

        info!(instance_id = %self.context.instance_id(), "Web service stopped");
        Ok(())
    }
}
