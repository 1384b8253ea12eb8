//! 服务层数据传输对象
//!
//! 定义服务层入参与结果，与 HTTP 层的请求/响应结构解耦

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    Benefit, BenefitClaimRecord, ClaimConditions, ClaimStatus, CodeInventory,
};

/// 创建权益请求
#[derive(Debug, Clone, Default)]
pub struct CreateBenefitRequest {
    pub creator_id: i64,
    pub title: String,
    pub description: Option<String>,
    /// 原始兑换码列表，服务层负责清洗与去重
    pub codes: Vec<String>,
    /// 未指定时为创建时间起一年
    pub expires_at: Option<DateTime<Utc>>,
    pub allowed_providers: Vec<String>,
    pub min_account_age_days: i32,
    pub claim_conditions: ClaimConditions,
}

/// 创建结果
///
/// total_count 可能小于提交的兑换码数量，差值由空白项与重复项构成
#[derive(Debug, Clone)]
pub struct AuthoredBenefit {
    pub benefit: Benefit,
    pub submitted_count: usize,
    pub blank_discarded: usize,
    pub duplicates_removed: usize,
}

/// 领取请求
#[derive(Debug, Clone)]
pub struct ClaimRequest {
    pub user_id: i64,
    pub link_token: Uuid,
    /// 本次会话的登录方式
    pub provider: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// 领取成功结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimOutcome {
    pub claim_id: i64,
    pub link_token: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    pub provider: String,
    pub claimed_at: DateTime<Utc>,
    /// 领取后的剩余数量
    pub remaining: i32,
}

/// 面向访问者的权益详情
#[derive(Debug, Clone)]
pub struct BenefitDetail {
    pub benefit: Benefit,
    pub claim_status: ClaimStatus,
}

/// 权益领取明细（仅创建者可见）
#[derive(Debug, Clone)]
pub struct BenefitClaimReport {
    pub benefit: Benefit,
    pub inventory: CodeInventory,
    pub claims: Vec<BenefitClaimRecord>,
}
