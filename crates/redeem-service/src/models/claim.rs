//! 领取记录与领取人模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 领取记录
///
/// 同一用户对同一权益至多一条，创建后不再修改
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: i64,
    pub user_id: i64,
    pub benefit_id: i64,
    pub code_id: i64,
    /// 领取时使用的登录方式
    pub provider: String,
    pub claimed_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// 待写入的领取记录
#[derive(Debug, Clone)]
pub struct NewClaim {
    pub user_id: i64,
    pub benefit_id: i64,
    pub code_id: i64,
    pub provider: String,
    pub claimed_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl NewClaim {
    pub fn into_claim(self, id: i64) -> Claim {
        Claim {
            id,
            user_id: self.user_id,
            benefit_id: self.benefit_id,
            code_id: self.code_id,
            provider: self.provider,
            claimed_at: self.claimed_at,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
        }
    }
}

/// 领取人档案
///
/// 来自身份服务维护的 users 表，只读
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClaimantProfile {
    #[sqlx(rename = "id")]
    pub user_id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// 用户的领取历史条目（关联权益与兑换码）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserClaimRecord {
    pub claim_id: i64,
    pub link_token: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    pub provider: String,
    pub claimed_at: DateTime<Utc>,
}

/// 权益下的领取明细（创建者查看）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BenefitClaimRecord {
    pub claim_id: i64,
    pub user_id: i64,
    pub username: String,
    pub code: String,
    pub provider: String,
    pub claimed_at: DateTime<Utc>,
    pub ip_address: Option<String>,
}
