//! IoT Insight Web Service
//!
//! - `view_models`: 面向 API 调用方的只读视图模型
//! - `query`: 设备读模型（查询端口 + 内存实现）
//! - `api`: HTTP 路由
//! - `service`: 注册到服务宿主的无状态服务
//! - `app`: 宿主装配（入口使用）

pub mod api;
pub mod app;
pub mod query;
pub mod service;
pub mod view_models;

pub use app::{build_runtime, run};
pub use query::{DeviceQuery, DeviceRecorder, InMemoryDeviceStore};
pub use service::WebService;
pub use view_models::DeviceViewModel;

/// 服务类型名称，需与 `runtime.service_types` 中的声明一致
pub const WEB_SERVICE_TYPE: &str = "WebServiceType";
