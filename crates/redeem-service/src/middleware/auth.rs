//! JWT 认证中间件
//!
//! 验证请求中的 Bearer Token 并将调用者注入请求扩展

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use serde_json::json;
use tracing::debug;

use crate::auth::{AuthError, AuthUser, Viewer};
use crate::state::AppState;

/// 认证中间件
///
/// 领取页详情（GET /api/claim/{token}）允许匿名访问：携带合法 Token 时注入访问者，
/// 未携带时以匿名身份继续；Token 无效仍返回 401。其余 /api 路由必须认证。
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if !path.starts_with("/api/") {
        return next.run(request).await;
    }
    let optional = request.method() == Method::GET && path.starts_with("/api/claim/");

    let bearer = request.headers().typed_get::<Authorization<Bearer>>();

    let user = match bearer {
        Some(Authorization(bearer)) => match state
            .jwt_manager
            .verify_token(bearer.token())
            .and_then(AuthUser::try_from)
        {
            Ok(user) => Some(user),
            Err(e) => return unauthorized_response(&e),
        },
        None if optional => None,
        None => return unauthorized_response(&AuthError::MissingToken),
    };

    if let Some(user) = &user {
        debug!(user_id = user.user_id, provider = %user.provider, "请求已认证");
        request.extensions_mut().insert(user.clone());
    }
    if optional {
        request.extensions_mut().insert(Viewer(user));
    }

    next.run(request).await
}

/// 生成 401 未授权响应
fn unauthorized_response(error: &AuthError) -> Response {
    let body = json!({
        "success": false,
        "code": "UNAUTHORIZED",
        "message": error.to_string(),
        "data": null
    });

    (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
}
