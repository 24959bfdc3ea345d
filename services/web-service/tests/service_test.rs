//! Web 服务生命周期测试

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use insight_bootstrap::{CancellationToken, ServiceContext, StatelessService};
use insight_common::ServiceTypeName;
use insight_config::{AppConfig, RuntimeConfig, ServerConfig, ServiceTypeConfig, TelemetryConfig};
use insight_errors::AppError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use web_service::{InMemoryDeviceStore, WebService, WEB_SERVICE_TYPE};

fn context(endpoint: SocketAddr) -> ServiceContext {
    let config = AppConfig {
        app_name: "insight-web".to_string(),
        app_env: "development".to_string(),
        server: ServerConfig {
            host: endpoint.ip().to_string(),
            port: endpoint.port(),
        },
        telemetry: TelemetryConfig::default(),
        runtime: RuntimeConfig {
            service_types: vec![ServiceTypeConfig::new(WEB_SERVICE_TYPE)],
            ..RuntimeConfig::default()
        },
    };
    ServiceContext::new(
        ServiceTypeName::new(WEB_SERVICE_TYPE).unwrap(),
        0,
        endpoint,
        Arc::new(config),
    )
}

/// 找一个空闲端口
async fn free_endpoint() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn http_get(endpoint: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(endpoint).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, endpoint
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_serves_until_shutdown() {
    let endpoint = free_endpoint().await;
    let service = Arc::new(WebService::new(
        context(endpoint),
        Arc::new(InMemoryDeviceStore::new()),
    ));
    let shutdown = CancellationToken::new();

    let handle = {
        let service = service.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { service.run(shutdown).await })
    };

    let response = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if TcpStream::connect(endpoint).await.is_ok() {
                return http_get(endpoint, "/api/devices").await;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("web service should start listening");

    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.ends_with("[]"));

    shutdown.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("web service should stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = occupied.local_addr().unwrap();

    let service = WebService::new(context(endpoint), Arc::new(InMemoryDeviceStore::new()));
    let result = service.run(CancellationToken::new()).await;

    assert!(matches!(result, Err(AppError::Unavailable(_))));
    assert_eq!(service.context().endpoint(), endpoint);
}
