//! 权益与领取限制模型

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::BenefitStatus;

/// 允许领取的登录方式集合
///
/// 保持声明顺序、去除空白项与重复项；空集合表示不限制
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowedProviders(Vec<String>);

impl AllowedProviders {
    pub fn new<I, S>(providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let list = providers
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .filter(|p| seen.insert(p.clone()))
            .collect();
        Self(list)
    }

    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.0.is_empty()
    }

    /// 精确匹配登录方式名称
    pub fn allows(&self, provider: &str) -> bool {
        self.is_unrestricted() || self.0.iter().any(|p| p == provider)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// 领取条件元数据
///
/// 按原样存储并回显，领取流程不做解释
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimConditions(BTreeMap<String, Value>);

impl ClaimConditions {
    pub fn new(entries: BTreeMap<String, Value>) -> Self {
        Self(entries)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.0
    }
}

/// 权益
///
/// 一组由创建者上传、通过分享链接领取的一次性兑换码
#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Benefit {
    pub id: i64,
    /// 对外分享的链接标识，与内部 id 无关
    pub link_token: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creator_id: i64,
    /// 创建时确定的兑换码总数，之后不再变化
    pub total_count: i32,
    /// 仅在领取事务中递增
    pub claimed_count: i32,
    pub status: BenefitStatus,
    #[sqlx(json)]
    pub allowed_providers: AllowedProviders,
    /// 0 表示不限制账号注册天数
    pub min_account_age_days: i32,
    #[sqlx(json)]
    pub claim_conditions: ClaimConditions,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Benefit {
    pub fn remaining(&self) -> i32 {
        (self.total_count - self.claimed_count).max(0)
    }

    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.creator_id == user_id
    }

    /// 领取链接：{base_url}/claim/{link_token}
    pub fn claim_url(&self, base_url: &str) -> String {
        format!("{}/claim/{}", base_url.trim_end_matches('/'), self.link_token)
    }
}

/// 待写入的权益
#[derive(Debug, Clone)]
pub struct NewBenefit {
    pub link_token: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creator_id: i64,
    pub total_count: i32,
    pub allowed_providers: AllowedProviders,
    pub min_account_age_days: i32,
    pub claim_conditions: ClaimConditions,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewBenefit {
    /// 写入后得到的权益记录
    pub fn into_benefit(self, id: i64) -> Benefit {
        Benefit {
            id,
            link_token: self.link_token,
            title: self.title,
            description: self.description,
            creator_id: self.creator_id,
            total_count: self.total_count,
            claimed_count: 0,
            status: BenefitStatus::Active,
            allowed_providers: self.allowed_providers,
            min_account_age_days: self.min_account_age_days,
            claim_conditions: self.claim_conditions,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}
