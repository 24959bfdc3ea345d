//! HTTP API

mod devices;
mod metrics;

use std::sync::Arc;

use axum::{extract::State, middleware, routing::get, Json, Router};
use insight_common::InstanceId;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::query::{DeviceQuery, DeviceRecorder};

pub use devices::RecordSightingRequest;

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub devices: Arc<dyn DeviceQuery>,
    pub sightings: Arc<dyn DeviceRecorder>,
    pub service_type: String,
    pub instance_id: InstanceId,
}

/// 构建 Web 服务路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/devices", get(devices::list_devices))
        .route(
            "/api/devices/{id}",
            get(devices::get_device).put(devices::record_sighting),
        )
        .route("/health", get(health_check))
        .route_layer(middleware::from_fn(metrics::track_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service_type: String,
    pub instance_id: InstanceId,
    pub version: String,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service_type: state.service_type,
        instance_id: state.instance_id,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
