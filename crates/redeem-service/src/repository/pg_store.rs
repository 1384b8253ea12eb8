//! PostgreSQL 存储实现
//!
//! 将各表仓储组合为 [`BenefitStore`]，事务内操作通过 `*_in_tx` 方法复用同一连接。

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::{
    BenefitRepository, BenefitStore, ClaimRepository, CodeAllocation, RedemptionCodeRepository,
    StoreTx,
};
use crate::error::Result;
use crate::models::{
    Benefit, BenefitClaimRecord, BenefitStatus, Claim, ClaimantProfile, CodeInventory,
    NewBenefit, NewClaim, UserClaimRecord,
};

const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(5);

/// PostgreSQL 权益存储
pub struct PgBenefitStore {
    pool: PgPool,
    benefit_repo: BenefitRepository,
    code_repo: RedemptionCodeRepository,
    claim_repo: ClaimRepository,
    statement_timeout: Duration,
}

impl PgBenefitStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            benefit_repo: BenefitRepository::new(pool.clone()),
            code_repo: RedemptionCodeRepository::new(pool.clone()),
            claim_repo: ClaimRepository::new(pool.clone()),
            pool,
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
        }
    }

    /// 事务内单条语句与锁等待的超时时间
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }
}

#[async_trait]
impl BenefitStore for PgBenefitStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let mut tx = self.pool.begin().await?;

        // 仅对当前事务生效
        let timeout = format!("{}ms", self.statement_timeout.as_millis());
        sqlx::query(
            "SELECT set_config('statement_timeout', $1, true), set_config('lock_timeout', $1, true)",
        )
        .bind(&timeout)
        .execute(&mut *tx)
        .await?;

        debug!(statement_timeout = %timeout, "事务已开启");
        Ok(Box::new(PgStoreTx { tx }))
    }

    async fn find_benefit_by_token(&self, link_token: Uuid) -> Result<Option<Benefit>> {
        self.benefit_repo.find_by_token(link_token).await
    }

    async fn list_benefits_by_creator(&self, creator_id: i64) -> Result<Vec<Benefit>> {
        self.benefit_repo.list_by_creator(creator_id).await
    }

    async fn transition_status(
        &self,
        benefit_id: i64,
        from: BenefitStatus,
        to: BenefitStatus,
    ) -> Result<bool> {
        self.benefit_repo.transition_status(benefit_id, from, to).await
    }

    async fn code_inventory(&self, benefit_id: i64) -> Result<CodeInventory> {
        self.code_repo.inventory(benefit_id).await
    }

    async fn has_claim(&self, user_id: i64, benefit_id: i64) -> Result<bool> {
        self.claim_repo.exists(user_id, benefit_id).await
    }

    async fn list_claims_by_user(&self, user_id: i64) -> Result<Vec<UserClaimRecord>> {
        self.claim_repo.list_by_user(user_id).await
    }

    async fn list_claims_by_benefit(&self, benefit_id: i64) -> Result<Vec<BenefitClaimRecord>> {
        self.claim_repo.list_by_benefit(benefit_id).await
    }
}

/// PostgreSQL 事务
///
/// 未提交即被 drop 时，连接归还连接池前由 sqlx 自动回滚
pub struct PgStoreTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn find_benefit_by_token(&mut self, link_token: Uuid) -> Result<Option<Benefit>> {
        BenefitRepository::find_by_token_in_tx(&mut self.tx, link_token).await
    }

    async fn find_claimant(&mut self, user_id: i64) -> Result<Option<ClaimantProfile>> {
        ClaimRepository::find_claimant_in_tx(&mut self.tx, user_id).await
    }

    async fn has_claim(&mut self, user_id: i64, benefit_id: i64) -> Result<bool> {
        ClaimRepository::exists_in_tx(&mut self.tx, user_id, benefit_id).await
    }

    async fn allocate_code(
        &mut self,
        benefit_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<CodeAllocation> {
        RedemptionCodeRepository::allocate_in_tx(&mut self.tx, benefit_id, user_id, now).await
    }

    async fn insert_claim(&mut self, claim: &NewClaim) -> Result<Claim> {
        ClaimRepository::insert_in_tx(&mut self.tx, claim).await
    }

    async fn increment_claimed_count(&mut self, benefit_id: i64) -> Result<i32> {
        BenefitRepository::increment_claimed_count_in_tx(&mut self.tx, benefit_id).await
    }

    async fn insert_benefit(&mut self, benefit: &NewBenefit) -> Result<Benefit> {
        BenefitRepository::insert_in_tx(&mut self.tx, benefit).await
    }

    async fn insert_codes(
        &mut self,
        benefit_id: i64,
        codes: &[String],
        now: DateTime<Utc>,
    ) -> Result<u64> {
        RedemptionCodeRepository::insert_batch_in_tx(&mut self.tx, benefit_id, codes, now).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
