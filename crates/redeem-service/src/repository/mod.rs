//! 数据访问层
//!
//! - `traits`: 服务层依赖的存储抽象
//! - `*_repo`: 各表的 PostgreSQL 仓储，事务内操作以 `*_in_tx` 静态方法提供
//! - `pg_store` / `memory_store`: 存储抽象的两种实现

mod benefit_repo;
mod claim_repo;
mod code_repo;
mod memory_store;
mod pg_store;
mod traits;

pub use benefit_repo::BenefitRepository;
pub use claim_repo::ClaimRepository;
pub use code_repo::RedemptionCodeRepository;
pub use memory_store::{MemoryBenefitStore, MemoryState, MemoryStoreTx};
pub use pg_store::{PgBenefitStore, PgStoreTx};
pub use traits::{BenefitStore, CodeAllocation, StoreTx};

#[cfg(test)]
pub use traits::MockBenefitStore;
