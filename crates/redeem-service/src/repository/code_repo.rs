//! 兑换码仓储
//!
//! 提供 redemption_codes 表的数据访问

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::error::Result;
use crate::models::{CodeInventory, CodeStatus, RedemptionCode};
use crate::repository::CodeAllocation;

/// 兑换码仓储
pub struct RedemptionCodeRepository {
    pool: PgPool,
}

impl RedemptionCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 在事务中批量写入兑换码，按传入顺序生成 id
    pub async fn insert_batch_in_tx(
        tx: &mut PgConnection,
        benefit_id: i64,
        codes: &[String],
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO redemption_codes (benefit_id, code, status, created_at)
            SELECT $1, c.code, $3, $4
            FROM UNNEST($2::text[]) WITH ORDINALITY AS c(code, ord)
            ORDER BY c.ord
            "#,
        )
        .bind(benefit_id)
        .bind(codes)
        .bind(CodeStatus::Available)
        .bind(now)
        .execute(tx)
        .await?;

        Ok(result.rows_affected())
    }

    /// 在事务中占用一个可用兑换码
    ///
    /// 子查询以 FOR UPDATE SKIP LOCKED 选出 id 最小且未被其他事务锁定的可用码，
    /// 外层 UPDATE 在同一语句内完成状态变更。没有更新到行时再区分"已领完"与"全部被锁定"。
    pub async fn allocate_in_tx(
        tx: &mut PgConnection,
        benefit_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<CodeAllocation> {
        let allocated = sqlx::query_as::<_, RedemptionCode>(
            r#"
            UPDATE redemption_codes
            SET status = $3, claimed_by = $4, claimed_at = $5
            WHERE id = (
                SELECT id
                FROM redemption_codes
                WHERE benefit_id = $1 AND status = $2
                ORDER BY id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, benefit_id, code, status, claimed_by, claimed_at, created_at
            "#,
        )
        .bind(benefit_id)
        .bind(CodeStatus::Available)
        .bind(CodeStatus::Claimed)
        .bind(user_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(code) = allocated {
            return Ok(CodeAllocation::Allocated(code));
        }

        let still_available: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM redemption_codes
                WHERE benefit_id = $1 AND status = $2
            )
            "#,
        )
        .bind(benefit_id)
        .bind(CodeStatus::Available)
        .fetch_one(&mut *tx)
        .await?;

        if still_available {
            Ok(CodeAllocation::Contended)
        } else {
            Ok(CodeAllocation::Exhausted)
        }
    }

    /// 按状态统计兑换码
    pub async fn inventory(&self, benefit_id: i64) -> Result<CodeInventory> {
        let inventory = sqlx::query_as::<_, CodeInventory>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'available') AS available,
                COUNT(*) FILTER (WHERE status = 'claimed') AS claimed,
                COUNT(*) FILTER (WHERE status = 'expired') AS expired
            FROM redemption_codes
            WHERE benefit_id = $1
            "#,
        )
        .bind(benefit_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(inventory)
    }
}
