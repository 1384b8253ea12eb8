//! 服务层
//!
//! 实现兑换业务逻辑，所有写操作通过注入的 [`BenefitStore`] 开启事务。
//!
//! ## 模块结构
//!
//! - `dto`: 服务层入参与结果
//! - `authoring_service`: 创建权益与初始兑换码
//! - `claim_service`: 领取事务协调（重试、超时）
//! - `lifecycle_service`: 权益状态变更
//! - `query_service`: 只读查询

pub mod authoring_service;
pub mod claim_service;
pub mod dto;
pub mod lifecycle_service;
pub mod query_service;

pub use authoring_service::AuthoringService;
pub use claim_service::ClaimService;
pub use dto::*;
pub use lifecycle_service::LifecycleService;
pub use query_service::QueryService;

use tracing::warn;

use crate::error::Result;
use crate::repository::StoreTx;

/// 根据结果提交或回滚事务
///
/// 失败时先回滚再返回原始错误；回滚本身的失败只记录日志
pub(crate) async fn finish_tx<T>(tx: Box<dyn StoreTx>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "事务回滚失败");
            }
            Err(err)
        }
    }
}
