//! 权益状态变更服务
//!
//! 仅创建者可变更状态，非创建者得到与不存在相同的结果。
//! 写入为基于观察到的旧状态的条件更新，竞争失败时返回并发冲突。

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use redeem_shared::observability::metrics;

use crate::error::{RedeemError, Result};
use crate::models::{Benefit, BenefitStatus};
use crate::repository::BenefitStore;

/// 权益状态变更服务
pub struct LifecycleService {
    store: Arc<dyn BenefitStore>,
}

impl LifecycleService {
    pub fn new(store: Arc<dyn BenefitStore>) -> Self {
        Self { store }
    }

    /// 变更权益状态，返回变更后的权益
    ///
    /// 目标状态与当前状态相同时不做任何写入
    #[instrument(skip(self), fields(requester_id = %requester_id, link_token = %link_token, target = %target))]
    pub async fn set_status(
        &self,
        requester_id: i64,
        link_token: Uuid,
        target: BenefitStatus,
    ) -> Result<Benefit> {
        let mut benefit = self
            .store
            .find_benefit_by_token(link_token)
            .await?
            .filter(|b| b.is_owned_by(requester_id))
            .ok_or_else(|| RedeemError::BenefitNotFound(link_token.to_string()))?;

        let current = benefit.status;
        if current == target {
            return Ok(benefit);
        }
        current.validate_transition(target)?;

        if !self.store.transition_status(benefit.id, current, target).await? {
            return Err(RedeemError::ConcurrencyConflict);
        }

        metrics::record_status_transition(current.as_str(), target.as_str());
        info!(from = %current, to = %target, "权益状态已变更");

        benefit.status = target;
        Ok(benefit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockBenefitStore;
    use chrono::{Duration, Utc};

    fn owned_benefit(status: BenefitStatus) -> Benefit {
        Benefit {
            id: 10,
            link_token: Uuid::new_v4(),
            creator_id: 1,
            total_count: 1,
            status,
            expires_at: Utc::now() + Duration::days(1),
            ..Default::default()
        }
    }

    fn store_returning(benefit: Benefit) -> MockBenefitStore {
        let mut store = MockBenefitStore::new();
        store
            .expect_find_benefit_by_token()
            .returning(move |_| Ok(Some(benefit.clone())));
        store
    }

    #[tokio::test]
    async fn test_creator_can_pause() {
        let benefit = owned_benefit(BenefitStatus::Active);
        let token = benefit.link_token;
        let mut store = store_returning(benefit);
        store
            .expect_transition_status()
            .withf(|id, from, to| {
                *id == 10 && *from == BenefitStatus::Active && *to == BenefitStatus::Paused
            })
            .times(1)
            .returning(|_, _, _| Ok(true));

        let service = LifecycleService::new(Arc::new(store));
        let updated = service.set_status(1, token, BenefitStatus::Paused).await.unwrap();
        assert_eq!(updated.status, BenefitStatus::Paused);
    }

    #[tokio::test]
    async fn test_non_creator_gets_not_found() {
        let benefit = owned_benefit(BenefitStatus::Active);
        let token = benefit.link_token;
        let mut store = store_returning(benefit);
        store.expect_transition_status().never();

        let service = LifecycleService::new(Arc::new(store));
        let err = service.set_status(2, token, BenefitStatus::Paused).await.unwrap_err();
        assert_eq!(err.error_code(), "BENEFIT_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_same_status_is_noop() {
        let benefit = owned_benefit(BenefitStatus::Paused);
        let token = benefit.link_token;
        let mut store = store_returning(benefit);
        store.expect_transition_status().never();

        let service = LifecycleService::new(Arc::new(store));
        let updated = service.set_status(1, token, BenefitStatus::Paused).await.unwrap();
        assert_eq!(updated.status, BenefitStatus::Paused);
    }

    #[tokio::test]
    async fn test_terminal_state_cannot_be_reactivated() {
        let benefit = owned_benefit(BenefitStatus::Expired);
        let token = benefit.link_token;
        let mut store = store_returning(benefit);
        store.expect_transition_status().never();

        let service = LifecycleService::new(Arc::new(store));
        let err = service.set_status(1, token, BenefitStatus::Active).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_lost_race_reports_conflict() {
        let benefit = owned_benefit(BenefitStatus::Active);
        let token = benefit.link_token;
        let mut store = store_returning(benefit);
        store
            .expect_transition_status()
            .times(1)
            .returning(|_, _, _| Ok(false));

        let service = LifecycleService::new(Arc::new(store));
        let err = service.set_status(1, token, BenefitStatus::Deleted).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
