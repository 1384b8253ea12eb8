//! 创建者侧 API 处理器
//!
//! 创建权益、查看自己创建的权益、变更状态、查看领取明细

use std::collections::BTreeMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::HeaderMap,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::auth::AuthUser;
use crate::handlers::{base_url, parse_link_token};
use crate::models::{
    Benefit, BenefitClaimRecord, BenefitStatus, ClaimConditions, CodeInventory,
};
use crate::response::{ApiResponse, ApiResult};
use crate::service::{BenefitClaimReport, CreateBenefitRequest};
use crate::state::AppState;

// ==================== DTO 定义 ====================

/// 权益响应 DTO
///
/// 对外只暴露分享链接标识，不暴露内部 id
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenefitDto {
    pub link_token: uuid::Uuid,
    pub title: String,
    pub description: Option<String>,
    pub total_count: i32,
    pub claimed_count: i32,
    pub remaining: i32,
    pub status: BenefitStatus,
    pub allowed_providers: Vec<String>,
    pub min_account_age_days: i32,
    pub claim_conditions: ClaimConditions,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub claim_url: String,
}

impl BenefitDto {
    pub fn new(benefit: Benefit, base_url: &str) -> Self {
        Self {
            claim_url: benefit.claim_url(base_url),
            remaining: benefit.remaining(),
            link_token: benefit.link_token,
            title: benefit.title,
            description: benefit.description,
            total_count: benefit.total_count,
            claimed_count: benefit.claimed_count,
            status: benefit.status,
            allowed_providers: benefit.allowed_providers.as_slice().to_vec(),
            min_account_age_days: benefit.min_account_age_days,
            claim_conditions: benefit.claim_conditions,
            created_at: benefit.created_at,
            expires_at: benefit.expires_at,
        }
    }
}

/// 创建权益请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBenefitBody {
    /// 长度上限按去除首尾空白后计算，由创建服务校验
    #[validate(length(min = 1, message = "标题不能为空"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(length(min = 1, message = "至少需要一个兑换码"))]
    pub codes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub allowed_providers: Vec<String>,
    #[validate(range(min = 0, message = "最小账号注册天数不能为负数"))]
    pub min_account_age_days: Option<i32>,
    #[serde(default)]
    pub claim_conditions: BTreeMap<String, Value>,
}

/// 创建权益响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBenefitDto {
    pub benefit: BenefitDto,
    pub submitted_count: usize,
    pub blank_discarded: usize,
    pub duplicates_removed: usize,
}

/// 状态变更请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusBody {
    #[validate(length(min = 1, message = "状态不能为空"))]
    pub status: String,
}

/// 领取明细响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenefitClaimsDto {
    pub benefit: BenefitDto,
    pub inventory: CodeInventory,
    pub claims: Vec<BenefitClaimRecord>,
}

// ==================== Handler ====================

/// 创建权益
///
/// POST /api/benefits
pub async fn create_benefit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    Json(body): Json<CreateBenefitBody>,
) -> ApiResult<CreatedBenefitDto> {
    body.validate()?;

    let request = CreateBenefitRequest {
        creator_id: user.user_id,
        title: body.title,
        description: body.description,
        codes: body.codes,
        expires_at: body.expires_at,
        allowed_providers: body.allowed_providers,
        min_account_age_days: body.min_account_age_days.unwrap_or(0),
        claim_conditions: ClaimConditions::new(body.claim_conditions),
    };

    let authored = state.authoring_service.create_benefit(request).await?;
    let base = base_url(&state, &headers);

    let message = if authored.blank_discarded + authored.duplicates_removed > 0 {
        format!(
            "创建成功，已忽略 {} 个空白兑换码和 {} 个重复兑换码",
            authored.blank_discarded, authored.duplicates_removed
        )
    } else {
        "创建成功".to_string()
    };

    Ok(Json(ApiResponse::success_with_message(
        CreatedBenefitDto {
            benefit: BenefitDto::new(authored.benefit, &base),
            submitted_count: authored.submitted_count,
            blank_discarded: authored.blank_discarded,
            duplicates_removed: authored.duplicates_removed,
        },
        message,
    )))
}

/// 我创建的权益
///
/// GET /api/benefits/my
pub async fn list_my_benefits(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
) -> ApiResult<Vec<BenefitDto>> {
    let benefits = state.query_service.list_my_benefits(user.user_id).await?;
    let base = base_url(&state, &headers);

    let items = benefits
        .into_iter()
        .map(|b| BenefitDto::new(b, &base))
        .collect();
    Ok(Json(ApiResponse::success(items)))
}

/// 变更权益状态
///
/// PUT /api/benefits/{token}/status
pub async fn update_benefit_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(token): Path<String>,
    headers: HeaderMap,
    Json(body): Json<UpdateStatusBody>,
) -> ApiResult<BenefitDto> {
    body.validate()?;
    let link_token = parse_link_token(&token)?;
    let target: BenefitStatus = body.status.parse()?;

    let benefit = state
        .lifecycle_service
        .set_status(user.user_id, link_token, target)
        .await?;

    let base = base_url(&state, &headers);
    Ok(Json(ApiResponse::success(BenefitDto::new(benefit, &base))))
}

/// 权益领取明细（仅创建者）
///
/// GET /api/benefits/{token}/claims
pub async fn list_benefit_claims(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> ApiResult<BenefitClaimsDto> {
    let link_token = parse_link_token(&token)?;
    let BenefitClaimReport {
        benefit,
        inventory,
        claims,
    } = state
        .query_service
        .list_benefit_claims(user.user_id, link_token)
        .await?;

    let base = base_url(&state, &headers);
    Ok(Json(ApiResponse::success(BenefitClaimsDto {
        benefit: BenefitDto::new(benefit, &base),
        inventory,
        claims,
    })))
}
