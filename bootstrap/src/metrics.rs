//! Metrics 模块
//!
//! 提供 Prometheus metrics 导出

use std::time::Instant;

use insight_telemetry::{init_metrics, TelemetryError};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusHandle;

/// Metrics 记录器
pub struct MetricsRecorder {
    handle: PrometheusHandle,
}

impl MetricsRecorder {
    /// 安装全局 Prometheus recorder
    pub fn install() -> Result<Self, TelemetryError> {
        Ok(Self {
            handle: init_metrics()?,
        })
    }

    /// 获取 Prometheus 格式的 metrics
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// 记录 HTTP 请求
pub fn record_http_request(method: &str, route: &str, status: u16, duration_ms: f64) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_ms", &labels).record(duration_ms);
}

/// 记录服务类型注册
pub fn record_service_registration(service_type: &str, success: bool) {
    let labels = [
        ("service_type", service_type.to_string()),
        ("success", success.to_string()),
    ];

    counter!("service_registrations_total", &labels).increment(1);
}

/// 记录实例生命周期事件（started / completed / failed / stopped）
pub fn record_instance_event(service_type: &str, event: &str) {
    let labels = [
        ("service_type", service_type.to_string()),
        ("event", event.to_string()),
    ];

    counter!("service_instance_events_total", &labels).increment(1);
}

/// 设置当前运行中的实例数
pub fn set_running_instances(count: usize) {
    gauge!("service_instances_running").set(count as f64);
}

/// 请求计时器
pub struct RequestTimer {
    start: Instant,
    method: String,
    route: String,
}

impl RequestTimer {
    pub fn new(method: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            method: method.into(),
            route: route.into(),
        }
    }

    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64() * 1000.0;
        record_http_request(&self.method, &self.route, status, duration);
    }
}
