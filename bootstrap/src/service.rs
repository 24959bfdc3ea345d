//! 无状态服务抽象

use std::sync::Arc;

use async_trait::async_trait;
use insight_errors::AppResult;
use tokio_util::sync::CancellationToken;

use crate::context::ServiceContext;

/// 无状态服务
///
/// `run` 在 `shutdown` 被取消前应持续运行；返回 `Err` 会让整个宿主停止
#[async_trait]
pub trait StatelessService: Send + Sync + 'static {
    async fn run(&self, shutdown: CancellationToken) -> AppResult<()>;
}

/// 服务工厂：根据宿主提供的上下文创建服务实例
pub(crate) type ServiceFactory =
    Arc<dyn Fn(ServiceContext) -> Arc<dyn StatelessService> + Send + Sync>;
