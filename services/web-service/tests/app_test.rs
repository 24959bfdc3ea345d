//! 宿主装配测试：注册失败必须让入口返回错误

use std::time::Duration;

use insight_bootstrap::InstanceStatus;
use insight_config::{AppConfig, RuntimeConfig, ServerConfig, ServiceTypeConfig, TelemetryConfig};
use insight_errors::AppError;
use tokio::net::{TcpListener, TcpStream};
use web_service::{build_runtime, run, WEB_SERVICE_TYPE};

fn config(port: u16, service_types: Vec<ServiceTypeConfig>) -> AppConfig {
    AppConfig {
        app_name: "insight-web".to_string(),
        app_env: "development".to_string(),
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port,
        },
        telemetry: TelemetryConfig::default(),
        runtime: RuntimeConfig {
            health_enabled: false,
            shutdown_timeout_secs: 1,
            service_types,
            ..RuntimeConfig::default()
        },
    }
}

#[test]
fn test_build_runtime_requires_declared_type() {
    let config = config(0, vec![ServiceTypeConfig::new("ApiServiceType")]);
    let result = build_runtime(config, None);
    assert!(matches!(result, Err(AppError::Registration(_))));
}

#[tokio::test]
async fn test_run_fails_when_registration_fails() {
    let config = config(0, vec![ServiceTypeConfig::new("ApiServiceType")]);

    let result = tokio::time::timeout(Duration::from_secs(5), run(config, None))
        .await
        .expect("registration failure should not leave the host running");

    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains(WEB_SERVICE_TYPE));
    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::Registration(_))
    ));
}

#[tokio::test]
async fn test_instance_is_ready_once_listening() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let runtime = build_runtime(
        config(port, vec![ServiceTypeConfig::new(WEB_SERVICE_TYPE)]),
        None,
    )
    .unwrap_or_else(|e| panic!("registration should succeed: {}", e));
    let shutdown = runtime.shutdown_handle();
    let registry = runtime.instances();

    let handle = tokio::spawn(runtime.run());

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let instances = registry.snapshot().await;
            if instances.len() == 1 && instances[0].status == InstanceStatus::Running {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("web service instance should report ready");

    assert!(TcpStream::connect(("127.0.0.1", port)).await.is_ok());

    shutdown.shutdown();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("host should stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(registry.snapshot().await[0].status, InstanceStatus::Stopped);
}
