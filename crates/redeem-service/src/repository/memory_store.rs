//! 内存存储实现
//!
//! 用于测试与本地开发。每个事务持有整个状态的独占异步锁，并在暂存副本上操作：
//! 提交时写回，回滚或 drop 时丢弃，事务之间因此是串行化的。
//! 约束检查与 migrations 中的 PostgreSQL 约束保持一致。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{BenefitStore, CodeAllocation, StoreTx};
use crate::error::{RedeemError, Result};
use crate::models::{
    Benefit, BenefitClaimRecord, BenefitStatus, Claim, ClaimantProfile, CodeInventory,
    CodeStatus, NewBenefit, NewClaim, RedemptionCode, UserClaimRecord,
};

/// 全部表的内存快照
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub users: BTreeMap<i64, ClaimantProfile>,
    pub benefits: BTreeMap<i64, Benefit>,
    pub codes: BTreeMap<i64, RedemptionCode>,
    pub claims: BTreeMap<i64, Claim>,
    next_benefit_id: i64,
    next_code_id: i64,
    next_claim_id: i64,
}

impl MemoryState {
    fn benefit_by_token(&self, link_token: Uuid) -> Option<&Benefit> {
        self.benefits.values().find(|b| b.link_token == link_token)
    }

    fn has_claim(&self, user_id: i64, benefit_id: i64) -> bool {
        self.claims
            .values()
            .any(|c| c.user_id == user_id && c.benefit_id == benefit_id)
    }

    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

/// 内存权益存储
#[derive(Clone, Default)]
pub struct MemoryBenefitStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBenefitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入一个领取人档案（模拟身份服务的 users 表）
    pub async fn register_user(&self, user_id: i64, username: &str, created_at: DateTime<Utc>) {
        let mut state = self.state.lock().await;
        state.users.insert(
            user_id,
            ClaimantProfile {
                user_id,
                username: username.to_string(),
                created_at,
            },
        );
    }

    /// 当前状态的副本
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    /// 权益下的全部兑换码，按 id 排序
    pub async fn codes_of(&self, benefit_id: i64) -> Vec<RedemptionCode> {
        let state = self.state.lock().await;
        state
            .codes
            .values()
            .filter(|c| c.benefit_id == benefit_id)
            .cloned()
            .collect()
    }

    /// 权益下的全部领取记录，按 id 排序
    pub async fn claims_of(&self, benefit_id: i64) -> Vec<Claim> {
        let state = self.state.lock().await;
        state
            .claims
            .values()
            .filter(|c| c.benefit_id == benefit_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BenefitStore for MemoryBenefitStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryStoreTx { guard, staged }))
    }

    async fn find_benefit_by_token(&self, link_token: Uuid) -> Result<Option<Benefit>> {
        let state = self.state.lock().await;
        Ok(state.benefit_by_token(link_token).cloned())
    }

    async fn list_benefits_by_creator(&self, creator_id: i64) -> Result<Vec<Benefit>> {
        let state = self.state.lock().await;
        let mut benefits: Vec<Benefit> = state
            .benefits
            .values()
            .filter(|b| b.creator_id == creator_id)
            .cloned()
            .collect();
        benefits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(benefits)
    }

    async fn transition_status(
        &self,
        benefit_id: i64,
        from: BenefitStatus,
        to: BenefitStatus,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state.benefits.get_mut(&benefit_id) {
            Some(benefit) if benefit.status == from => {
                benefit.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn code_inventory(&self, benefit_id: i64) -> Result<CodeInventory> {
        let state = self.state.lock().await;
        let mut inventory = CodeInventory::default();
        for code in state.codes.values().filter(|c| c.benefit_id == benefit_id) {
            match code.status {
                CodeStatus::Available => inventory.available += 1,
                CodeStatus::Claimed => inventory.claimed += 1,
                CodeStatus::Expired => inventory.expired += 1,
            }
        }
        Ok(inventory)
    }

    async fn has_claim(&self, user_id: i64, benefit_id: i64) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state.has_claim(user_id, benefit_id))
    }

    async fn list_claims_by_user(&self, user_id: i64) -> Result<Vec<UserClaimRecord>> {
        let state = self.state.lock().await;
        let mut records = Vec::new();
        for claim in state.claims.values().filter(|c| c.user_id == user_id) {
            let benefit = state.benefits.get(&claim.benefit_id);
            let code = state.codes.get(&claim.code_id);
            if let (Some(benefit), Some(code)) = (benefit, code) {
                records.push(UserClaimRecord {
                    claim_id: claim.id,
                    link_token: benefit.link_token,
                    title: benefit.title.clone(),
                    description: benefit.description.clone(),
                    code: code.code.clone(),
                    provider: claim.provider.clone(),
                    claimed_at: claim.claimed_at,
                });
            }
        }
        records.sort_by(|a, b| b.claimed_at.cmp(&a.claimed_at).then(b.claim_id.cmp(&a.claim_id)));
        Ok(records)
    }

    async fn list_claims_by_benefit(&self, benefit_id: i64) -> Result<Vec<BenefitClaimRecord>> {
        let state = self.state.lock().await;
        let mut records = Vec::new();
        for claim in state.claims.values().filter(|c| c.benefit_id == benefit_id) {
            let user = state.users.get(&claim.user_id);
            let code = state.codes.get(&claim.code_id);
            if let (Some(user), Some(code)) = (user, code) {
                records.push(BenefitClaimRecord {
                    claim_id: claim.id,
                    user_id: claim.user_id,
                    username: user.username.clone(),
                    code: code.code.clone(),
                    provider: claim.provider.clone(),
                    claimed_at: claim.claimed_at,
                    ip_address: claim.ip_address.clone(),
                });
            }
        }
        records.sort_by(|a, b| b.claimed_at.cmp(&a.claimed_at).then(b.claim_id.cmp(&a.claim_id)));
        Ok(records)
    }
}

/// 内存事务
pub struct MemoryStoreTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryStoreTx {
    async fn find_benefit_by_token(&mut self, link_token: Uuid) -> Result<Option<Benefit>> {
        Ok(self.staged.benefit_by_token(link_token).cloned())
    }

    async fn find_claimant(&mut self, user_id: i64) -> Result<Option<ClaimantProfile>> {
        Ok(self.staged.users.get(&user_id).cloned())
    }

    async fn has_claim(&mut self, user_id: i64, benefit_id: i64) -> Result<bool> {
        Ok(self.staged.has_claim(user_id, benefit_id))
    }

    async fn allocate_code(
        &mut self,
        benefit_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<CodeAllocation> {
        let code = self
            .staged
            .codes
            .values_mut()
            .find(|c| c.benefit_id == benefit_id && c.status == CodeStatus::Available);

        match code {
            Some(code) => {
                code.status = CodeStatus::Claimed;
                code.claimed_by = Some(user_id);
                code.claimed_at = Some(now);
                Ok(CodeAllocation::Allocated(code.clone()))
            }
            None => Ok(CodeAllocation::Exhausted),
        }
    }

    async fn insert_claim(&mut self, claim: &NewClaim) -> Result<Claim> {
        if self.staged.has_claim(claim.user_id, claim.benefit_id) {
            return Err(RedeemError::AlreadyClaimed {
                user_id: claim.user_id,
                benefit_id: claim.benefit_id,
            });
        }
        if self.staged.claims.values().any(|c| c.code_id == claim.code_id) {
            return Err(RedeemError::Internal(format!(
                "兑换码已关联其他领取记录: code_id={}",
                claim.code_id
            )));
        }
        if !self.staged.users.contains_key(&claim.user_id) {
            return Err(RedeemError::Internal(format!(
                "领取人不存在: user_id={}",
                claim.user_id
            )));
        }

        let id = MemoryState::next_id(&mut self.staged.next_claim_id);
        let created = claim.clone().into_claim(id);
        self.staged.claims.insert(id, created.clone());
        Ok(created)
    }

    async fn increment_claimed_count(&mut self, benefit_id: i64) -> Result<i32> {
        match self.staged.benefits.get_mut(&benefit_id) {
            Some(benefit) if benefit.claimed_count < benefit.total_count => {
                benefit.claimed_count += 1;
                Ok(benefit.claimed_count)
            }
            _ => Err(RedeemError::Internal(format!(
                "已领取数将超过兑换码总数: benefit_id={}",
                benefit_id
            ))),
        }
    }

    async fn insert_benefit(&mut self, benefit: &NewBenefit) -> Result<Benefit> {
        if self.staged.benefit_by_token(benefit.link_token).is_some() {
            return Err(RedeemError::Internal(format!(
                "分享链接重复: {}",
                benefit.link_token
            )));
        }

        let id = MemoryState::next_id(&mut self.staged.next_benefit_id);
        let created = benefit.clone().into_benefit(id);
        self.staged.benefits.insert(id, created.clone());
        Ok(created)
    }

    async fn insert_codes(
        &mut self,
        benefit_id: i64,
        codes: &[String],
        now: DateTime<Utc>,
    ) -> Result<u64> {
        for code in codes {
            let id = MemoryState::next_id(&mut self.staged.next_code_id);
            self.staged.codes.insert(
                id,
                RedemptionCode {
                    id,
                    benefit_id,
                    code: code.clone(),
                    status: CodeStatus::Available,
                    claimed_by: None,
                    claimed_at: None,
                    created_at: now,
                },
            );
        }
        Ok(codes.len() as u64)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let Self { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AllowedProviders, ClaimConditions};
    use chrono::Duration;

    fn new_benefit(creator_id: i64) -> NewBenefit {
        let now = Utc::now();
        NewBenefit {
            link_token: Uuid::new_v4(),
            title: "测试权益".to_string(),
            description: None,
            creator_id,
            total_count: 2,
            allowed_providers: AllowedProviders::unrestricted(),
            min_account_age_days: 0,
            claim_conditions: ClaimConditions::default(),
            created_at: now,
            expires_at: now + Duration::days(30),
        }
    }

    async fn seeded() -> (MemoryBenefitStore, Benefit) {
        let store = MemoryBenefitStore::new();
        store.register_user(1, "creator", Utc::now()).await;

        let mut tx = store.begin().await.unwrap();
        let benefit = tx.insert_benefit(&new_benefit(1)).await.unwrap();
        tx.insert_codes(benefit.id, &["A".to_string(), "B".to_string()], Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();
        (store, benefit)
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let (store, benefit) = seeded().await;

        let found = store.find_benefit_by_token(benefit.link_token).await.unwrap();
        assert_eq!(found.map(|b| b.id), Some(benefit.id));

        let inventory = store.code_inventory(benefit.id).await.unwrap();
        assert_eq!(inventory.available, 2);
        assert_eq!(inventory.total(), 2);
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let (store, benefit) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        let allocation = tx.allocate_code(benefit.id, 1, Utc::now()).await.unwrap();
        assert!(matches!(allocation, CodeAllocation::Allocated(_)));
        tx.rollback().await.unwrap();

        let inventory = store.code_inventory(benefit.id).await.unwrap();
        assert_eq!(inventory.available, 2);
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let (store, benefit) = seeded().await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.increment_claimed_count(benefit.id).await.unwrap();
        }

        let found = store.find_benefit_by_token(benefit.link_token).await.unwrap().unwrap();
        assert_eq!(found.claimed_count, 0);
    }

    #[tokio::test]
    async fn test_allocation_takes_lowest_id_first() {
        let (store, benefit) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        let first = match tx.allocate_code(benefit.id, 1, Utc::now()).await.unwrap() {
            CodeAllocation::Allocated(code) => code,
            other => panic!("unexpected allocation: {:?}", other),
        };
        assert_eq!(first.code, "A");
        let second = tx.allocate_code(benefit.id, 1, Utc::now()).await.unwrap();
        assert!(matches!(second, CodeAllocation::Allocated(ref c) if c.code == "B"));
        let third = tx.allocate_code(benefit.id, 1, Utc::now()).await.unwrap();
        assert!(matches!(third, CodeAllocation::Exhausted));
    }

    #[tokio::test]
    async fn test_duplicate_claim_rejected() {
        let (store, benefit) = seeded().await;
        let codes = store.codes_of(benefit.id).await;

        let claim = |code_id| NewClaim {
            user_id: 1,
            benefit_id: benefit.id,
            code_id,
            provider: "github".to_string(),
            claimed_at: Utc::now(),
            ip_address: None,
            user_agent: None,
        };

        let mut tx = store.begin().await.unwrap();
        tx.insert_claim(&claim(codes[0].id)).await.unwrap();
        let err = tx.insert_claim(&claim(codes[1].id)).await.unwrap_err();
        assert_eq!(err.error_code(), "ALREADY_CLAIMED");
    }

    #[tokio::test]
    async fn test_counter_guard() {
        let (store, benefit) = seeded().await;

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.increment_claimed_count(benefit.id).await.unwrap(), 1);
        assert_eq!(tx.increment_claimed_count(benefit.id).await.unwrap(), 2);
        assert!(tx.increment_claimed_count(benefit.id).await.is_err());
    }

    #[tokio::test]
    async fn test_conditional_status_transition() {
        let (store, benefit) = seeded().await;

        assert!(store
            .transition_status(benefit.id, BenefitStatus::Active, BenefitStatus::Paused)
            .await
            .unwrap());
        assert!(!store
            .transition_status(benefit.id, BenefitStatus::Active, BenefitStatus::Deleted)
            .await
            .unwrap());
    }
}
