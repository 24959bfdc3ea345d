//! insight-bootstrap - 服务宿主运行时
//!
//! 服务类型注册、实例放置、健康检查与优雅关闭

mod context;
mod health;
mod instances;
pub mod metrics;
mod runtime;
mod service;
mod shutdown;

pub use context::*;
pub use health::*;
pub use instances::*;
pub use runtime::*;
pub use service::StatelessService;
pub use shutdown::*;

pub use tokio_util::sync::CancellationToken;
