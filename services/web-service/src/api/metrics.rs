//! 请求 metrics 中间件

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use insight_bootstrap::metrics::RequestTimer;

pub(crate) async fn track_metrics(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let timer = RequestTimer::new(request.method().as_str(), route);

    let response = next.run(request).await;
    timer.finish(response.status().as_u16());
    response
}
