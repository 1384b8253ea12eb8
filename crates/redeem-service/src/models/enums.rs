//! 兑换服务枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化，落库与对外均为小写字符串

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RedeemError;

/// 权益状态
///
/// 只有 Active 且未过期的权益接受领取
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum BenefitStatus {
    /// 进行中
    #[default]
    Active,
    /// 创建者手动暂停，可恢复
    Paused,
    /// 已过期
    Expired,
    /// 已删除，对外表现为不存在
    Deleted,
}

impl BenefitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Expired => "expired",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for BenefitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BenefitStatus {
    type Err = RedeemError;

    /// 只接受四个小写字面量
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "expired" => Ok(Self::Expired),
            "deleted" => Ok(Self::Deleted),
            other => Err(RedeemError::InvalidInput(format!("无效的权益状态: {}", other))),
        }
    }
}

/// 兑换码状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum CodeStatus {
    /// 可领取
    #[default]
    Available,
    /// 已被领取，终态
    Claimed,
    /// 已失效
    Expired,
}

/// 面向单个访问者的领取状态（详情页展示用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    /// 可以领取
    Available,
    /// 当前访问者已领取
    Claimed,
    /// 权益已暂停
    Paused,
    /// 权益已过期
    Expired,
    /// 兑换码已领完
    Depleted,
}
