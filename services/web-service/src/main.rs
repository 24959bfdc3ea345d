//! IoT Insight Web Service - 进程入口
//!
//! 向服务宿主注册 `WebServiceType`，然后常驻直到收到关闭信号

use std::process::ExitCode;
use std::sync::Arc;

use insight_bootstrap::{init_runtime, metrics::MetricsRecorder};
use insight_config::AppConfig;
use tracing::{error, warn};

const CONFIG_DIR: &str = "config";

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = match AppConfig::load(CONFIG_DIR) {
        Ok(config) => config,
        Err(e) => {
            // tracing 尚未初始化
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_runtime(&config);

    let metrics = match MetricsRecorder::install() {
        Ok(recorder) => Some(Arc::new(recorder)),
        Err(e) => {
            warn!(error = %e, "Metrics disabled");
            None
        }
    };

    match web_service::run(config, metrics).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Service host terminated: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
