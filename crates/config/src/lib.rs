//! insight-config - 配置加载库
//!
//! 配置来源按优先级从低到高：
//! 1. `{config_dir}/default.toml`
//! 2. `{config_dir}/{APP_ENV}.toml`
//! 3. `INSIGHT_` 前缀的环境变量（`__` 表示嵌套，例如 `INSIGHT_SERVER__PORT`）

use std::collections::HashSet;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::Deserialize;
use thiserror::Error;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "INSIGHT_";

/// 默认健康检查端口相对服务端口的偏移
const HEALTH_PORT_OFFSET: u16 = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// 服务类型声明
///
/// 宿主只接受在这里声明过的服务类型注册
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceTypeConfig {
    pub name: String,
    #[serde(default = "default_instance_count")]
    pub instance_count: u32,
}

fn default_instance_count() -> u32 {
    1
}

impl ServiceTypeConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance_count: default_instance_count(),
        }
    }
}

/// 服务宿主运行时配置
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_node_name")]
    pub node_name: String,
    #[serde(default = "default_health_enabled")]
    pub health_enabled: bool,
    /// 健康检查端口（默认为服务端口 + 1000）
    pub health_port: Option<u16>,
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    #[serde(default)]
    pub service_types: Vec<ServiceTypeConfig>,
}

fn default_node_name() -> String {
    "node-0".to_string()
}

fn default_health_enabled() -> bool {
    true
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            health_enabled: default_health_enabled(),
            health_port: None,
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            service_types: Vec::new(),
        }
    }
}

impl RuntimeConfig {
    /// 查找已声明的服务类型
    pub fn service_type(&self, name: &str) -> Option<&ServiceTypeConfig> {
        self.service_types.iter().find(|t| t.name == name)
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

fn default_app_env() -> String {
    std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string())
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = default_app_env();

        let config: Self = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            // app_env 只认 APP_ENV，与选中的环境文件保持一致
            .merge(Serialized::default("app_env", &env))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// 校验服务类型声明
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runtime.service_types.is_empty() {
            return Err(ConfigError::Invalid(
                "runtime.service_types must declare at least one service type".to_string(),
            ));
        }

        if self.runtime.health_port.is_none()
            && self.server.port.checked_add(HEALTH_PORT_OFFSET).is_none()
        {
            return Err(ConfigError::Invalid(format!(
                "server.port {} leaves no room for the default health port; set runtime.health_port",
                self.server.port
            )));
        }

        let mut seen = HashSet::new();
        for service_type in &self.runtime.service_types {
            if service_type.name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "service type name must not be empty".to_string(),
                ));
            }
            if service_type.instance_count == 0 {
                return Err(ConfigError::Invalid(format!(
                    "service type {} must have at least one instance",
                    service_type.name
                )));
            }
            if !seen.insert(service_type.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "service type {} is declared more than once",
                    service_type.name
                )));
            }
        }

        Ok(())
    }

    /// 健康检查端口
    ///
    /// 未显式配置时为服务端口 + 1000；服务端口为 0 时同样使用临时端口
    pub fn health_port(&self) -> u16 {
        match self.runtime.health_port {
            Some(port) => port,
            None if self.server.port == 0 => 0,
            None => self.server.port.checked_add(HEALTH_PORT_OFFSET).unwrap_or(0),
        }
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}
