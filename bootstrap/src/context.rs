//! 服务上下文
//!
//! 宿主在放置服务实例时创建，交给服务工厂

use std::net::SocketAddr;
use std::sync::Arc;

use insight_common::{InstanceId, ServiceTypeName};
use insight_config::AppConfig;
use tracing::info;

use crate::instances::{InstanceRegistry, InstanceStatus};

/// 服务上下文
#[derive(Debug, Clone)]
pub struct ServiceContext {
    service_type: ServiceTypeName,
    instance_id: InstanceId,
    instance_index: u32,
    node_name: String,
    endpoint: SocketAddr,
    config: Arc<AppConfig>,
    registry: InstanceRegistry,
}

impl ServiceContext {
    pub fn new(
        service_type: ServiceTypeName,
        instance_index: u32,
        endpoint: SocketAddr,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            service_type,
            instance_id: InstanceId::new(),
            instance_index,
            node_name: config.runtime.node_name.clone(),
            endpoint,
            config,
            registry: InstanceRegistry::new(),
        }
    }

    /// 绑定到宿主的实例表，`report_ready` 写入该表
    pub(crate) fn with_registry(mut self, registry: InstanceRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn service_type(&self) -> &ServiceTypeName {
        &self.service_type
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// 同一服务类型内的实例序号（从 0 开始）
    pub fn instance_index(&self) -> u32 {
        self.instance_index
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// 分配给该实例的监听地址
    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 实例已可对外服务（例如监听器已绑定），就绪检查从此刻起计入该实例
    pub async fn report_ready(&self) {
        self.registry
            .set_status(self.instance_id, InstanceStatus::Running)
            .await;
        info!(
            service_type = %self.service_type,
            instance_id = %self.instance_id,
            "Service instance ready"
        );
    }
}
