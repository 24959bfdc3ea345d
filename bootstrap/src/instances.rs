//! 服务实例表

use std::collections::BTreeMap;
use std::sync::Arc;

use insight_common::InstanceId;
use tokio::sync::RwLock;

use crate::context::ServiceContext;

/// 实例状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    Starting,
    Running,
    /// `run` 在关闭前正常返回
    Completed,
    Failed,
    Stopped,
}

impl InstanceStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Running | Self::Completed)
    }
}

/// 实例信息
#[derive(Debug, Clone)]
pub struct InstanceInfo {
    pub instance_id: InstanceId,
    pub service_type: String,
    pub endpoint: String,
    pub status: InstanceStatus,
}

/// 宿主内所有实例的状态
#[derive(Debug, Clone, Default)]
pub struct InstanceRegistry {
    inner: Arc<RwLock<BTreeMap<InstanceId, InstanceInfo>>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, context: &ServiceContext) {
        let info = InstanceInfo {
            instance_id: context.instance_id(),
            service_type: context.service_type().to_string(),
            endpoint: context.endpoint().to_string(),
            status: InstanceStatus::Starting,
        };
        self.inner.write().await.insert(info.instance_id, info);
    }

    pub async fn set_status(&self, instance_id: InstanceId, status: InstanceStatus) {
        if let Some(info) = self.inner.write().await.get_mut(&instance_id) {
            info.status = status;
        }
    }

    /// 将仍处于 Starting/Running 的实例标记为 Stopped（强制中止之后）
    pub async fn stop_remaining(&self) -> usize {
        let mut inner = self.inner.write().await;
        let mut stopped = 0;
        for info in inner.values_mut() {
            if matches!(info.status, InstanceStatus::Starting | InstanceStatus::Running) {
                info.status = InstanceStatus::Stopped;
                stopped += 1;
            }
        }
        stopped
    }

    pub async fn snapshot(&self) -> Vec<InstanceInfo> {
        self.inner.read().await.values().cloned().collect()
    }
}
