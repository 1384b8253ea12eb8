//! 领取资格判定
//!
//! 纯函数：根据权益的限制条件与领取人档案给出允许或拒绝。
//! 先判定登录方式，再判定账号注册天数。

use chrono::{DateTime, Utc};

use crate::error::RedeemError;
use crate::models::{AllowedProviders, Benefit};

const SECONDS_PER_DAY: i64 = 86_400;

/// 权益上的资格限制
#[derive(Debug, Clone, Copy)]
pub struct EligibilityPolicy<'a> {
    pub allowed_providers: &'a AllowedProviders,
    pub min_account_age_days: i32,
}

impl Benefit {
    pub fn eligibility_policy(&self) -> EligibilityPolicy<'_> {
        EligibilityPolicy {
            allowed_providers: &self.allowed_providers,
            min_account_age_days: self.min_account_age_days,
        }
    }
}

/// 参与判定的领取人信息
#[derive(Debug, Clone, Copy)]
pub struct Claimant<'a> {
    /// 本次会话的登录方式
    pub provider: &'a str,
    pub account_created_at: DateTime<Utc>,
}

/// 拒绝原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    ProviderNotAllowed { provider: String },
    AccountTooNew { required_days: i32, actual_days: i64 },
}

/// 判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Denied(DenialReason),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }

    pub fn into_result(self) -> Result<(), RedeemError> {
        match self {
            Self::Eligible => Ok(()),
            Self::Denied(reason) => Err(reason.into()),
        }
    }
}

impl From<DenialReason> for RedeemError {
    fn from(reason: DenialReason) -> Self {
        match reason {
            DenialReason::ProviderNotAllowed { provider } => Self::ProviderNotAllowed { provider },
            DenialReason::AccountTooNew {
                required_days,
                actual_days,
            } => Self::AccountTooNew {
                required_days,
                actual_days,
            },
        }
    }
}

/// 账号注册天数，向下取整
pub fn account_age_days(account_created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - account_created_at)
        .num_seconds()
        .div_euclid(SECONDS_PER_DAY)
}

/// 判定领取资格
pub fn evaluate(policy: &EligibilityPolicy<'_>, claimant: &Claimant<'_>, now: DateTime<Utc>) -> Eligibility {
    if !policy.allowed_providers.allows(claimant.provider) {
        return Eligibility::Denied(DenialReason::ProviderNotAllowed {
            provider: claimant.provider.to_string(),
        });
    }

    if policy.min_account_age_days > 0 {
        let actual_days = account_age_days(claimant.account_created_at, now);
        if actual_days < i64::from(policy.min_account_age_days) {
            return Eligibility::Denied(DenialReason::AccountTooNew {
                required_days: policy.min_account_age_days,
                actual_days,
            });
        }
    }

    Eligibility::Eligible
}
