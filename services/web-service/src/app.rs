//! 服务宿主装配
//!
//! 入口与集成测试共用：注册 `WebServiceType` 并运行宿主

use std::sync::Arc;

use anyhow::Context;
use insight_bootstrap::{metrics::MetricsRecorder, ServiceRuntime};
use insight_config::AppConfig;
use insight_errors::AppResult;

use crate::query::InMemoryDeviceStore;
use crate::service::WebService;
use crate::WEB_SERVICE_TYPE;

/// 创建宿主并注册 `WebServiceType`
///
/// 配置中未声明该服务类型时返回 `AppError::Registration`
pub fn build_runtime(
    config: AppConfig,
    metrics: Option<Arc<MetricsRecorder>>,
) -> AppResult<ServiceRuntime> {
    let mut runtime = ServiceRuntime::new(config);
    if let Some(metrics) = metrics {
        runtime = runtime.with_metrics(metrics);
    }

    let store = Arc::new(InMemoryDeviceStore::new());
    runtime.register_service(WEB_SERVICE_TYPE, move |context| {
        WebService::new(context, store.clone())
    })?;

    Ok(runtime)
}

/// 注册并运行到关闭；任何错误都应让进程以非零状态退出
pub async fn run(config: AppConfig, metrics: Option<Arc<MetricsRecorder>>) -> anyhow::Result<()> {
    let runtime = build_runtime(config, metrics)
        .with_context(|| format!("Failed to register {}", WEB_SERVICE_TYPE))?;

    runtime.run().await.context("Service host stopped with an error")
}
