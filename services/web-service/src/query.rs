//! 设备读模型

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use insight_errors::{AppError, AppResult};
use tokio::sync::RwLock;
use tracing::debug;

use crate::view_models::DeviceViewModel;

/// 设备查询端口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceQuery: Send + Sync {
    /// 按 id 升序返回所有设备
    async fn list_devices(&self) -> AppResult<Vec<DeviceViewModel>>;

    async fn get_device(&self, id: &str) -> AppResult<Option<DeviceViewModel>>;
}

/// 设备上报端口
#[async_trait]
pub trait DeviceRecorder: Send + Sync {
    /// 记录一次设备上报，返回记录后的视图
    ///
    /// 只保留最新的时间戳，较旧的上报被忽略
    async fn record_sighting(
        &self,
        id: &str,
        timestamp: DateTime<FixedOffset>,
    ) -> AppResult<DeviceViewModel>;
}

/// 内存设备存储
#[derive(Debug, Default)]
pub struct InMemoryDeviceStore {
    devices: RwLock<BTreeMap<String, DateTime<FixedOffset>>>,
}

impl InMemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceQuery for InMemoryDeviceStore {
    async fn list_devices(&self) -> AppResult<Vec<DeviceViewModel>> {
        let devices = self.devices.read().await;
        Ok(devices
            .iter()
            .map(|(id, timestamp)| DeviceViewModel::new(id.clone(), *timestamp))
            .collect())
    }

    async fn get_device(&self, id: &str) -> AppResult<Option<DeviceViewModel>> {
        let devices = self.devices.read().await;
        Ok(devices
            .get(id)
            .map(|timestamp| DeviceViewModel::new(id, *timestamp)))
    }
}

#[async_trait]
impl DeviceRecorder for InMemoryDeviceStore {
    async fn record_sighting(
        &self,
        id: &str,
        timestamp: DateTime<FixedOffset>,
    ) -> AppResult<DeviceViewModel> {
        if id.trim().is_empty() {
            return Err(AppError::validation("device id must not be blank"));
        }

        let mut devices = self.devices.write().await;
        let current = devices
            .entry(id.to_string())
            .and_modify(|last_seen| {
                if timestamp > *last_seen {
                    *last_seen = timestamp;
                } else {
                    debug!(device_id = id, %timestamp, "Ignoring stale sighting");
                }
            })
            .or_insert(timestamp);

        Ok(DeviceViewModel::new(id, *current))
    }
}
