//! 领取事务协调
//!
//! 一次领取在单个事务中完成，任一步失败整体回滚：
//!
//! 1. 按分享链接读取权益 -> 2. 可领取性（删除 / 过期 / 暂停）
//!    -> 3. 读取领取人档案并判定资格（登录方式、账号注册天数）
//!    -> 4. 重复领取检查 -> 5. 占用一个兑换码 -> 6. 写入领取记录
//!    -> 7. 已领取数加一 -> 8. 提交
//!
//! ## 并发控制
//!
//! 不使用应用层锁。兑换码占用是单条条件更新（SKIP LOCKED），
//! (user_id, benefit_id) 唯一约束兜底重复领取，已领取数为带上限的条件更新。
//! 并发冲突（ConcurrencyConflict）以指数退避有限次重试，其余错误原样返回。
//! 每次尝试受事务超时约束，超时即放弃该尝试并回滚。

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use redeem_shared::config::ClaimConfig;
use redeem_shared::observability::metrics;
use redeem_shared::retry::{RetryPolicy, retry_with_policy};

use crate::eligibility::{self, Claimant};
use crate::error::{RedeemError, Result};
use crate::models::NewClaim;
use crate::repository::{BenefitStore, CodeAllocation, StoreTx};
use crate::service::dto::{ClaimOutcome, ClaimRequest};
use crate::service::finish_tx;

const OPERATION_NAME: &str = "claim_benefit";

/// 领取服务
pub struct ClaimService {
    store: Arc<dyn BenefitStore>,
    retry_policy: RetryPolicy,
    transaction_timeout: Duration,
}

impl ClaimService {
    pub fn new(store: Arc<dyn BenefitStore>, config: &ClaimConfig) -> Self {
        Self::with_policy(store, config.retry_policy(), config.transaction_timeout())
    }

    pub fn with_policy(
        store: Arc<dyn BenefitStore>,
        retry_policy: RetryPolicy,
        transaction_timeout: Duration,
    ) -> Self {
        Self {
            store,
            retry_policy,
            transaction_timeout,
        }
    }

    /// 领取一个兑换码
    #[instrument(
        skip(self, request),
        fields(user_id = request.user_id, link_token = %request.link_token, provider = %request.provider)
    )]
    pub async fn claim(&self, request: ClaimRequest) -> Result<ClaimOutcome> {
        let started = Instant::now();

        let result = retry_with_policy(
            &self.retry_policy,
            OPERATION_NAME,
            RedeemError::is_retryable,
            || self.attempt(&request),
        )
        .await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(err) => err.error_code(),
        };
        metrics::record_claim(&request.provider, outcome, started.elapsed().as_secs_f64());

        match &result {
            Ok(claimed) => info!(
                claim_id = claimed.claim_id,
                remaining = claimed.remaining,
                "领取成功"
            ),
            Err(err) if err.is_business_error() => {
                info!(code = err.error_code(), reason = %err, "领取被拒绝")
            }
            Err(err) => error!(code = err.error_code(), error = %err, "领取失败"),
        }

        result
    }

    /// 单次尝试：开启事务、执行、提交或回滚，整体受超时约束
    ///
    /// 超时后 future 被丢弃，未提交的事务随之回滚
    async fn attempt(&self, request: &ClaimRequest) -> Result<ClaimOutcome> {
        let attempt = async {
            let mut tx = self.store.begin().await?;
            let result = Self::claim_in_tx(tx.as_mut(), request, Utc::now()).await;
            finish_tx(tx, result).await
        };

        match tokio::time::timeout(self.transaction_timeout, attempt).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    timeout_ms = self.transaction_timeout.as_millis() as u64,
                    "领取事务超时，已放弃本次尝试"
                );
                Err(RedeemError::TransactionTimeout)
            }
        }
    }

    async fn claim_in_tx(
        tx: &mut dyn StoreTx,
        request: &ClaimRequest,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        let benefit = tx
            .find_benefit_by_token(request.link_token)
            .await?
            .ok_or_else(|| RedeemError::BenefitNotFound(request.link_token.to_string()))?;

        benefit.ensure_claimable(now)?;

        // claims.user_id 外键指向 users，档案缺失说明身份数据不一致
        let profile = tx.find_claimant(request.user_id).await?.ok_or_else(|| {
            RedeemError::Internal(format!("领取人档案不存在: user_id={}", request.user_id))
        })?;

        let claimant = Claimant {
            provider: &request.provider,
            account_created_at: profile.created_at,
        };
        eligibility::evaluate(&benefit.eligibility_policy(), &claimant, now).into_result()?;

        if tx.has_claim(request.user_id, benefit.id).await? {
            return Err(RedeemError::AlreadyClaimed {
                user_id: request.user_id,
                benefit_id: benefit.id,
            });
        }

        let code = match tx.allocate_code(benefit.id, request.user_id, now).await? {
            CodeAllocation::Allocated(code) => code,
            CodeAllocation::Exhausted => return Err(RedeemError::NoCodeAvailable(benefit.link_token)),
            CodeAllocation::Contended => return Err(RedeemError::ConcurrencyConflict),
        };

        let claim = tx
            .insert_claim(&NewClaim {
                user_id: request.user_id,
                benefit_id: benefit.id,
                code_id: code.id,
                provider: request.provider.clone(),
                claimed_at: now,
                ip_address: request.ip_address.clone(),
                user_agent: request.user_agent.clone(),
            })
            .await?;

        let claimed_count = tx.increment_claimed_count(benefit.id).await?;

        Ok(ClaimOutcome {
            claim_id: claim.id,
            link_token: benefit.link_token,
            title: benefit.title,
            description: benefit.description,
            code: code.code,
            provider: claim.provider,
            claimed_at: claim.claimed_at,
            remaining: benefit.total_count - claimed_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MemoryBenefitStore, MockBenefitStore};
    use uuid::Uuid;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            multiplier: 2.0,
        }
    }

    fn request() -> ClaimRequest {
        ClaimRequest {
            user_id: 7,
            link_token: Uuid::new_v4(),
            provider: "github".to_string(),
            ip_address: None,
            user_agent: None,
        }
    }

    #[tokio::test]
    async fn test_conflict_retried_a_bounded_number_of_times() {
        let mut store = MockBenefitStore::new();
        store
            .expect_begin()
            .times(4)
            .returning(|| Err(RedeemError::ConcurrencyConflict));

        let service =
            ClaimService::with_policy(Arc::new(store), fast_policy(3), Duration::from_secs(1));
        let err = service.claim(request()).await.unwrap_err();

        assert!(matches!(err, RedeemError::ConcurrencyConflict));
    }

    #[tokio::test]
    async fn test_non_conflict_error_not_retried() {
        let mut store = MockBenefitStore::new();
        store
            .expect_begin()
            .times(1)
            .returning(|| Err(RedeemError::Internal("连接断开".to_string())));

        let service =
            ClaimService::with_policy(Arc::new(store), fast_policy(3), Duration::from_secs(1));
        let err = service.claim(request()).await.unwrap_err();

        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_token_not_found() {
        let store = Arc::new(MemoryBenefitStore::new());
        let service = ClaimService::with_policy(store, fast_policy(0), Duration::from_secs(1));

        let err = service.claim(request()).await.unwrap_err();
        assert_eq!(err.error_code(), "BENEFIT_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_attempt_exceeding_timeout_is_abandoned() {
        let store = Arc::new(MemoryBenefitStore::new());
        // 持有一个未结束的事务，使领取无法开启自己的事务
        let blocker = store.begin().await.unwrap();

        let service =
            ClaimService::with_policy(store.clone(), fast_policy(3), Duration::from_millis(50));
        let err = service.claim(request()).await.unwrap_err();

        assert!(matches!(err, RedeemError::TransactionTimeout));
        assert!(!err.is_retryable());
        drop(blocker);
    }
}
