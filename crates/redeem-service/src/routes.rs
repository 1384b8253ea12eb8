//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router,
    http::StatusCode,
    middleware,
    routing::{get, post, put},
};
use redeem_shared::config::ClaimConfig;
use tower_http::timeout::TimeoutLayer;

use crate::middleware::{auth_middleware, client_origin};
use crate::{handlers, state::AppState};

/// 创建者侧路由
fn benefit_routes() -> Router<AppState> {
    Router::new()
        .route("/benefits", post(handlers::benefit::create_benefit))
        .route("/benefits/my", get(handlers::benefit::list_my_benefits))
        .route(
            "/benefits/{token}/status",
            put(handlers::benefit::update_benefit_status),
        )
        .route(
            "/benefits/{token}/claims",
            get(handlers::benefit::list_benefit_claims),
        )
}

/// 领取侧路由
fn claim_routes() -> Router<AppState> {
    Router::new()
        .route("/claims/my", get(handlers::claim::list_my_claims))
        .route(
            "/claim/{token}",
            get(handlers::claim::get_benefit_detail).post(handlers::claim::claim_benefit),
        )
}

/// 全部业务 API 路由（挂载于 /api 下）
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(benefit_routes()).merge(claim_routes())
}

/// 构建带认证与来源提取中间件的应用路由
///
/// 进程入口在此基础上叠加健康检查、CORS 与可观测性中间件
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(middleware::from_fn(client_origin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

/// 整体请求超时，需覆盖领取的全部重试轮次；超时返回 504
pub fn request_timeout_layer(claim: &ClaimConfig) -> TimeoutLayer {
    let timeout = claim.transaction_timeout() * (claim.max_retries + 2);
    TimeoutLayer::with_status_code(StatusCode::GATEWAY_TIMEOUT, timeout)
}
