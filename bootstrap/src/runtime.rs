//! 服务运行时
//!
//! 注册服务类型、放置实例，并在收到关闭信号前保持进程常驻

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use insight_common::ServiceTypeName;
use insight_config::AppConfig;
use insight_errors::{AppError, AppResult};
use insight_telemetry::{init_tracing, init_tracing_json};
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{error, info, warn};

use crate::context::ServiceContext;
use crate::health::HealthServer;
use crate::instances::{InstanceRegistry, InstanceStatus};
use crate::metrics::{
    record_instance_event, record_service_registration, set_running_instances, MetricsRecorder,
};
use crate::service::{ServiceFactory, StatelessService};
use crate::shutdown::{shutdown_signal, ShutdownController};

/// 初始化服务运行时（日志）
pub fn init_runtime(config: &AppConfig) {
    if config.is_production() {
        init_tracing_json(&config.telemetry.log_level);
    } else {
        init_tracing(&config.telemetry.log_level);
    }

    info!(
        app_name = %config.app_name,
        app_env = %config.app_env,
        "Runtime initialized"
    );
}

struct Registration {
    service_type: ServiceTypeName,
    endpoints: Vec<SocketAddr>,
    factory: ServiceFactory,
}

/// 服务宿主
///
/// # 示例
///
/// ```ignore
/// let mut runtime = ServiceRuntime::new(config);
/// runtime.register_service("WebServiceType", |ctx| WebService::new(ctx))?;
/// runtime.run().await?;
/// ```
pub struct ServiceRuntime {
    config: Arc<AppConfig>,
    registrations: Vec<Registration>,
    registry: InstanceRegistry,
    shutdown: ShutdownController,
    metrics: Option<Arc<MetricsRecorder>>,
    next_port_offset: u32,
}

impl ServiceRuntime {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            registrations: Vec::new(),
            registry: InstanceRegistry::new(),
            shutdown: ShutdownController::new(),
            metrics: None,
            next_port_offset: 0,
        }
    }

    /// 挂载 metrics 记录器（用于 /metrics 端点）
    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// 获取关闭句柄
    pub fn shutdown_handle(&self) -> ShutdownController {
        self.shutdown.clone()
    }

    /// 实例状态表
    pub fn instances(&self) -> InstanceRegistry {
        self.registry.clone()
    }

    /// 注册服务类型
    ///
    /// 服务类型必须在 `runtime.service_types` 中声明，且同名类型只能注册一次
    pub fn register_service<F, S>(&mut self, service_type: &str, factory: F) -> AppResult<()>
    where
        F: Fn(ServiceContext) -> S + Send + Sync + 'static,
        S: StatelessService,
    {
        let result = self.try_register(service_type, factory);
        record_service_registration(service_type, result.is_ok());
        if let Err(e) = &result {
            error!(service_type, error = %e, "Service type registration failed");
        }
        result
    }

    fn try_register<F, S>(&mut self, service_type: &str, factory: F) -> AppResult<()>
    where
        F: Fn(ServiceContext) -> S + Send + Sync + 'static,
        S: StatelessService,
    {
        let name =
            ServiceTypeName::new(service_type).map_err(|e| AppError::registration(e.to_string()))?;

        if self.registrations.iter().any(|r| r.service_type == name) {
            return Err(AppError::registration(format!(
                "Service type {} is already registered",
                name
            )));
        }

        let instance_count = self
            .config
            .runtime
            .service_type(name.as_str())
            .map(|declared| declared.instance_count)
            .ok_or_else(|| {
                AppError::registration(format!(
                    "Service type {} is not declared in runtime.service_types",
                    name
                ))
            })?;

        let endpoints = (0..instance_count)
            .map(|i| self.endpoint_for(self.next_port_offset + i))
            .collect::<AppResult<Vec<_>>>()?;
        self.next_port_offset += instance_count;

        let factory: ServiceFactory =
            Arc::new(move |ctx: ServiceContext| Arc::new(factory(ctx)) as Arc<dyn StatelessService>);

        info!(service_type = %name, instance_count, "Service type registered");

        self.registrations.push(Registration {
            service_type: name,
            endpoints,
            factory,
        });
        Ok(())
    }

    /// 计算实例监听地址，端口 0 保持为系统分配
    fn endpoint_for(&self, offset: u32) -> AppResult<SocketAddr> {
        let server = &self.config.server;
        let port = if server.port == 0 {
            0
        } else {
            u16::try_from(u32::from(server.port) + offset).map_err(|_| {
                AppError::registration(format!(
                    "Port {} + {} exceeds the valid port range",
                    server.port, offset
                ))
            })?
        };

        format!("{}:{}", server.host, port).parse().map_err(|e| {
            AppError::registration(format!("Invalid endpoint {}:{}: {}", server.host, port, e))
        })
    }

    /// 放置所有实例并等待关闭
    ///
    /// 实例在调用 `ServiceContext::report_ready` 之前处于 Starting 状态。
    /// 实例正常返回不会结束宿主；任何实例失败都会触发关闭并返回该错误
    pub async fn run(self) -> AppResult<()> {
        if self.registrations.is_empty() {
            return Err(AppError::registration("No service types registered"));
        }

        let Self {
            config,
            registrations,
            registry,
            shutdown,
            metrics,
            ..
        } = self;

        let signal_handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                shutdown.shutdown();
            })
        };

        let health_handle = if config.runtime.health_enabled {
            let server = HealthServer::new(registry.clone(), metrics, config.health_port());
            let listener = match server.bind().await {
                Ok(listener) => listener,
                Err(e) => {
                    signal_handle.abort();
                    error!(port = config.health_port(), error = %e, "Health server bind failed");
                    return Err(AppError::unavailable(format!(
                        "Failed to bind health port {}: {}",
                        config.health_port(),
                        e
                    )));
                }
            };
            let token = shutdown.token();
            Some(tokio::spawn(async move {
                if let Err(e) = server.serve(listener, token).await {
                    error!("Health server error: {}", e);
                }
            }))
        } else {
            None
        };

        let mut tasks = JoinSet::new();
        let mut contexts: HashMap<Id, ServiceContext> = HashMap::new();

        for registration in &registrations {
            for (index, endpoint) in registration.endpoints.iter().enumerate() {
                let context = ServiceContext::new(
                    registration.service_type.clone(),
                    index as u32,
                    *endpoint,
                    config.clone(),
                )
                .with_registry(registry.clone());
                registry.insert(&context).await;

                let service = (registration.factory)(context.clone());
                let token = shutdown.token();
                let handle = tasks.spawn(async move { service.run(token).await });

                info!(
                    service_type = %context.service_type(),
                    instance_id = %context.instance_id(),
                    endpoint = %context.endpoint(),
                    "Service instance placed"
                );
                record_instance_event(context.service_type().as_str(), "started");
                contexts.insert(handle.id(), context);
            }
        }
        set_running_instances(contexts.len());

        info!(
            node_name = %config.runtime.node_name,
            instances = contexts.len(),
            "Service host started, waiting for shutdown"
        );

        let mut failure: Option<AppError> = None;
        loop {
            if tasks.is_empty() {
                shutdown.wait().await;
                break;
            }

            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                Some(joined) = tasks.join_next_with_id() => {
                    let stopping = shutdown.is_shutdown();
                    if let Some(e) = record_exit(joined, &contexts, &registry, stopping).await {
                        failure = Some(e);
                        shutdown.shutdown();
                        break;
                    }
                }
            }
        }

        let timeout = Duration::from_secs(config.runtime.shutdown_timeout_secs);
        let drain = async {
            while let Some(joined) = tasks.join_next_with_id().await {
                if let Some(e) = record_exit(joined, &contexts, &registry, true).await {
                    failure.get_or_insert(e);
                }
            }
        };
        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!(
                timeout_secs = config.runtime.shutdown_timeout_secs,
                "Service instances did not stop in time, aborting"
            );
            tasks.shutdown().await;
            let aborted = registry.stop_remaining().await;
            warn!(aborted, "Service instances aborted");
        }

        set_running_instances(0);
        signal_handle.abort();
        if let Some(handle) = health_handle {
            handle.abort();
        }

        match failure {
            Some(e) => Err(e),
            None => {
                info!("Service host stopped");
                Ok(())
            }
        }
    }
}

/// 记录实例退出，返回需要上报的错误
async fn record_exit(
    joined: Result<(Id, AppResult<()>), JoinError>,
    contexts: &HashMap<Id, ServiceContext>,
    registry: &InstanceRegistry,
    stopping: bool,
) -> Option<AppError> {
    let (id, result) = match joined {
        Ok((id, result)) => (id, result),
        Err(e) => {
            let message = if e.is_panic() {
                "Service instance panicked".to_string()
            } else {
                "Service instance was cancelled".to_string()
            };
            (e.id(), Err(AppError::internal(message)))
        }
    };

    let context = contexts.get(&id)?;
    let service_type = context.service_type().as_str();

    match result {
        Ok(()) => {
            let status = if stopping {
                InstanceStatus::Stopped
            } else {
                InstanceStatus::Completed
            };
            info!(
                service_type,
                instance_id = %context.instance_id(),
                ?status,
                "Service instance returned"
            );
            registry.set_status(context.instance_id(), status).await;
            record_instance_event(service_type, if stopping { "stopped" } else { "completed" });
            None
        }
        Err(e) => {
            error!(
                service_type,
                instance_id = %context.instance_id(),
                error = %e,
                "Service instance failed"
            );
            registry
                .set_status(context.instance_id(), InstanceStatus::Failed)
                .await;
            record_instance_event(service_type, "failed");
            Some(e)
        }
    }
}
