//! 权益生命周期
//!
//! 状态流转：
//!
//! ```text
//! active  -> paused | expired | deleted
//! paused  -> active | expired | deleted
//! expired -> deleted
//! deleted -> expired
//! ```
//!
//! expired 与 deleted 之间可互相调整，但都不能回到 active / paused。
//!
//! 可领取 = status 为 active 且当前时间早于 expires_at。过期时间在每次读取时计算，
//! 不依赖后台任务改写状态。

use chrono::{DateTime, Utc};

use crate::error::{RedeemError, Result};
use crate::models::{Benefit, BenefitStatus};

/// 权益在某一时刻的可领取性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Claimable,
    Paused,
    Expired,
    Deleted,
}

impl BenefitStatus {
    /// 是否允许从当前状态变更为 target，相同状态视为幂等
    pub fn can_transition_to(self, target: BenefitStatus) -> bool {
        use BenefitStatus::*;

        if self == target {
            return true;
        }
        matches!(
            (self, target),
            (Active, Paused | Expired | Deleted)
                | (Paused, Active | Expired | Deleted)
                | (Expired, Deleted)
                | (Deleted, Expired)
        )
    }

    /// 校验状态变更
    pub fn validate_transition(self, target: BenefitStatus) -> Result<()> {
        if self.can_transition_to(target) {
            Ok(())
        } else {
            Err(RedeemError::InvalidInput(format!(
                "不允许的状态变更: {} -> {}",
                self, target
            )))
        }
    }
}

impl Benefit {
    /// 计算可领取性
    ///
    /// 判定顺序：deleted > expired 状态 > paused > 到期时间
    pub fn availability(&self, now: DateTime<Utc>) -> Availability {
        match self.status {
            BenefitStatus::Deleted => Availability::Deleted,
            BenefitStatus::Expired => Availability::Expired,
            BenefitStatus::Paused => Availability::Paused,
            BenefitStatus::Active if now >= self.expires_at => Availability::Expired,
            BenefitStatus::Active => Availability::Claimable,
        }
    }

    /// 不可领取时返回对应的业务错误
    pub fn ensure_claimable(&self, now: DateTime<Utc>) -> Result<()> {
        match self.availability(now) {
            Availability::Claimable => Ok(()),
            Availability::Deleted => Err(RedeemError::BenefitNotFound(self.link_token.to_string())),
            Availability::Expired => Err(RedeemError::BenefitExpired(self.link_token)),
            Availability::Paused => Err(RedeemError::BenefitPaused(self.link_token)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn benefit(status: BenefitStatus, expires_in: Duration) -> Benefit {
        Benefit {
            status,
            total_count: 1,
            expires_at: Utc::now() + expires_in,
            ..Default::default()
        }
    }

    #[test]
    fn test_transition_table() {
        use BenefitStatus::*;

        let allowed = [
            (Active, Paused),
            (Active, Expired),
            (Active, Deleted),
            (Paused, Active),
            (Paused, Expired),
            (Paused, Deleted),
            (Expired, Deleted),
            (Deleted, Expired),
        ];
        let rejected = [
            (Expired, Active),
            (Expired, Paused),
            (Deleted, Active),
            (Deleted, Paused),
        ];

        for (from, to) in allowed {
            assert!(from.can_transition_to(to), "{from} -> {to}");
        }
        for (from, to) in rejected {
            let err = from.validate_transition(to).unwrap_err();
            assert_eq!(err.error_code(), "INVALID_INPUT", "{from} -> {to}");
        }
        for status in [Active, Paused, Expired, Deleted] {
            assert!(status.can_transition_to(status));
        }
    }

    #[test]
    fn test_active_and_unexpired_is_claimable() {
        let b = benefit(BenefitStatus::Active, Duration::days(1));
        assert_eq!(b.availability(Utc::now()), Availability::Claimable);
        assert!(b.ensure_claimable(Utc::now()).is_ok());
    }

    #[test]
    fn test_active_past_expiry_is_expired() {
        let b = benefit(BenefitStatus::Active, -Duration::seconds(1));
        let err = b.ensure_claimable(Utc::now()).unwrap_err();
        assert_eq!(err.error_code(), "BENEFIT_EXPIRED");
    }

    #[test]
    fn test_paused_wins_over_elapsed_expiry() {
        let b = benefit(BenefitStatus::Paused, -Duration::seconds(1));
        assert_eq!(b.availability(Utc::now()), Availability::Paused);
        let err = b.ensure_claimable(Utc::now()).unwrap_err();
        assert_eq!(err.error_code(), "BENEFIT_PAUSED");

        let b = benefit(BenefitStatus::Expired, Duration::days(1));
        assert_eq!(b.availability(Utc::now()), Availability::Expired);
    }

    #[test]
    fn test_deleted_reads_as_not_found() {
        let b = benefit(BenefitStatus::Deleted, -Duration::days(1));
        let err = b.ensure_claimable(Utc::now()).unwrap_err();
        assert_eq!(err.error_code(), "BENEFIT_NOT_FOUND");
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let now = Utc::now();
        let b = Benefit {
            status: BenefitStatus::Active,
            expires_at: now,
            ..Default::default()
        };
        assert_eq!(b.availability(now), Availability::Expired);
        assert_eq!(
            b.availability(now - Duration::milliseconds(1)),
            Availability::Claimable
        );
    }
}
