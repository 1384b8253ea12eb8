//! 兑换码模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CodeStatus;

/// 兑换码
///
/// Available -> Claimed 只发生一次，Claimed 为终态
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionCode {
    pub id: i64,
    pub benefit_id: i64,
    /// 不透明字符串，不同权益之间可以重复
    pub code: String,
    pub status: CodeStatus,
    pub claimed_by: Option<i64>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// 单个权益的库存统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CodeInventory {
    pub available: i64,
    pub claimed: i64,
    pub expired: i64,
}

impl CodeInventory {
    pub fn total(&self) -> i64 {
        self.available + self.claimed + self.expired
    }
}
