//! 领取侧 API 处理器

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Serialize;

use crate::auth::{AuthUser, Viewer};
use crate::handlers::benefit::BenefitDto;
use crate::handlers::{base_url, parse_link_token};
use crate::middleware::ClientOrigin;
use crate::models::{ClaimStatus, UserClaimRecord};
use crate::response::{ApiResponse, ApiResult};
use crate::service::{ClaimOutcome, ClaimRequest};
use crate::state::AppState;

/// 权益详情响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenefitDetailDto {
    pub benefit: BenefitDto,
    pub claim_status: ClaimStatus,
}

/// 权益详情，可匿名访问
///
/// GET /api/claim/{token}
pub async fn get_benefit_detail(
    State(state): State<AppState>,
    Extension(Viewer(viewer)): Extension<Viewer>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> ApiResult<BenefitDetailDto> {
    let link_token = parse_link_token(&token)?;
    let detail = state
        .query_service
        .benefit_detail(link_token, viewer.map(|v| v.user_id))
        .await?;

    let base = base_url(&state, &headers);
    Ok(Json(ApiResponse::success(BenefitDetailDto {
        benefit: BenefitDto::new(detail.benefit, &base),
        claim_status: detail.claim_status,
    })))
}

/// 领取兑换码
///
/// POST /api/claim/{token}
pub async fn claim_benefit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Extension(origin): Extension<ClientOrigin>,
    Path(token): Path<String>,
) -> ApiResult<ClaimOutcome> {
    let link_token = parse_link_token(&token)?;

    let outcome = state
        .claim_service
        .claim(ClaimRequest {
            user_id: user.user_id,
            link_token,
            provider: user.provider,
            ip_address: origin.ip_address,
            user_agent: origin.user_agent,
        })
        .await?;

    Ok(Json(ApiResponse::success_with_message(outcome, "领取成功")))
}

/// 我的领取记录
///
/// GET /api/claims/my
pub async fn list_my_claims(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<UserClaimRecord>> {
    let claims = state.query_service.list_my_claims(user.user_id).await?;
    Ok(Json(ApiResponse::success(claims)))
}
