//! 设备 API

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, FixedOffset};
use insight_errors::{AppError, AppResult};
use serde::Deserialize;
use tracing::info;

use super::AppState;
use crate::view_models::DeviceViewModel;

/// 设备上报请求
#[derive(Debug, Clone, Deserialize)]
pub struct RecordSightingRequest {
    pub timestamp: DateTime<FixedOffset>,
}

pub(crate) async fn list_devices(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<DeviceViewModel>>> {
    let devices = state.devices.list_devices().await?;
    Ok(Json(devices))
}

pub(crate) async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DeviceViewModel>> {
    state
        .devices
        .get_device(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("device {}", id)))
}

pub(crate) async fn record_sighting(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RecordSightingRequest>,
) -> AppResult<Json<DeviceViewModel>> {
    let device = state
        .sightings
        .record_sighting(&id, request.timestamp)
        .await?;
    info!(device_id = %device.id(), timestamp = %device.timestamp(), "Device sighting recorded");
    Ok(Json(device))
}
