//! 仓储 Trait 定义
//!
//! 服务层只依赖这两个抽象：`BenefitStore` 提供连接池级别的查询并负责开启事务，
//! `StoreTx` 绑定在一个已开启的事务上，由 `commit` / `rollback` 消费。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Benefit, BenefitClaimRecord, BenefitStatus, Claim, ClaimantProfile, CodeInventory,
    NewBenefit, NewClaim, RedemptionCode, UserClaimRecord,
};

/// 兑换码分配结果
#[derive(Debug, Clone)]
pub enum CodeAllocation {
    /// 成功占用一个兑换码
    Allocated(RedemptionCode),
    /// 已无可用兑换码
    Exhausted,
    /// 仍有可用兑换码但全部被其他进行中的事务锁定
    Contended,
}

/// 权益存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BenefitStore: Send + Sync {
    /// 开启事务
    async fn begin(&self) -> Result<Box<dyn StoreTx>>;

    // 权益
    async fn find_benefit_by_token(&self, link_token: Uuid) -> Result<Option<Benefit>>;
    async fn list_benefits_by_creator(&self, creator_id: i64) -> Result<Vec<Benefit>>;
    /// 条件更新：仅当当前状态仍为 from 时写入 to，返回是否更新成功
    async fn transition_status(
        &self,
        benefit_id: i64,
        from: BenefitStatus,
        to: BenefitStatus,
    ) -> Result<bool>;

    // 兑换码
    async fn code_inventory(&self, benefit_id: i64) -> Result<CodeInventory>;

    // 领取记录
    async fn has_claim(&self, user_id: i64, benefit_id: i64) -> Result<bool>;
    async fn list_claims_by_user(&self, user_id: i64) -> Result<Vec<UserClaimRecord>>;
    async fn list_claims_by_benefit(&self, benefit_id: i64) -> Result<Vec<BenefitClaimRecord>>;
}

/// 事务内操作接口
#[async_trait]
pub trait StoreTx: Send {
    async fn find_benefit_by_token(&mut self, link_token: Uuid) -> Result<Option<Benefit>>;
    async fn find_claimant(&mut self, user_id: i64) -> Result<Option<ClaimantProfile>>;
    async fn has_claim(&mut self, user_id: i64, benefit_id: i64) -> Result<bool>;

    /// 以单条条件更新占用一个可用兑换码，这是兑换码状态变化的唯一路径
    async fn allocate_code(
        &mut self,
        benefit_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<CodeAllocation>;

    /// 写入领取记录，(user_id, benefit_id) 唯一约束冲突时返回 AlreadyClaimed
    async fn insert_claim(&mut self, claim: &NewClaim) -> Result<Claim>;

    /// 已领取数加一并返回新值，超过总数时返回错误
    async fn increment_claimed_count(&mut self, benefit_id: i64) -> Result<i32>;

    async fn insert_benefit(&mut self, benefit: &NewBenefit) -> Result<Benefit>;
    async fn insert_codes(
        &mut self,
        benefit_id: i64,
        codes: &[String],
        now: DateTime<Utc>,
    ) -> Result<u64>;

    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}
