//! 权益仓储
//!
//! 提供 benefits 表的数据访问

use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{RedeemError, Result};
use crate::models::{Benefit, BenefitStatus, NewBenefit};

/// 权益仓储
pub struct BenefitRepository {
    pool: PgPool,
}

impl BenefitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按分享链接获取权益
    pub async fn find_by_token(&self, link_token: Uuid) -> Result<Option<Benefit>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_by_token_in_tx(&mut *conn, link_token).await
    }

    /// 在事务中按分享链接获取权益
    pub async fn find_by_token_in_tx(
        tx: &mut PgConnection,
        link_token: Uuid,
    ) -> Result<Option<Benefit>> {
        let benefit = sqlx::query_as::<_, Benefit>(
            r#"
            SELECT id, link_token, title, description, creator_id, total_count,
                   claimed_count, status, allowed_providers, min_account_age_days,
                   claim_conditions, created_at, expires_at
            FROM benefits
            WHERE link_token = $1
            "#,
        )
        .bind(link_token)
        .fetch_optional(tx)
        .await?;

        Ok(benefit)
    }

    /// 列出创建者的全部权益，最新创建的在前
    pub async fn list_by_creator(&self, creator_id: i64) -> Result<Vec<Benefit>> {
        let benefits = sqlx::query_as::<_, Benefit>(
            r#"
            SELECT id, link_token, title, description, creator_id, total_count,
                   claimed_count, status, allowed_providers, min_account_age_days,
                   claim_conditions, created_at, expires_at
            FROM benefits
            WHERE creator_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(benefits)
    }

    /// 在事务中写入权益
    pub async fn insert_in_tx(tx: &mut PgConnection, benefit: &NewBenefit) -> Result<Benefit> {
        let created = sqlx::query_as::<_, Benefit>(
            r#"
            INSERT INTO benefits (
                link_token, title, description, creator_id, total_count, claimed_count,
                status, allowed_providers, min_account_age_days, claim_conditions,
                created_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, 0, $6, $7, $8, $9, $10, $11)
            RETURNING id, link_token, title, description, creator_id, total_count,
                      claimed_count, status, allowed_providers, min_account_age_days,
                      claim_conditions, created_at, expires_at
            "#,
        )
        .bind(benefit.link_token)
        .bind(&benefit.title)
        .bind(&benefit.description)
        .bind(benefit.creator_id)
        .bind(benefit.total_count)
        .bind(BenefitStatus::Active)
        .bind(Json(&benefit.allowed_providers))
        .bind(benefit.min_account_age_days)
        .bind(Json(&benefit.claim_conditions))
        .bind(benefit.created_at)
        .bind(benefit.expires_at)
        .fetch_one(tx)
        .await?;

        Ok(created)
    }

    /// 在事务中递增已领取数
    ///
    /// 条件更新保证 claimed_count 不会超过 total_count
    pub async fn increment_claimed_count_in_tx(tx: &mut PgConnection, benefit_id: i64) -> Result<i32> {
        let claimed_count: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE benefits
            SET claimed_count = claimed_count + 1
            WHERE id = $1 AND claimed_count < total_count
            RETURNING claimed_count
            "#,
        )
        .bind(benefit_id)
        .fetch_optional(tx)
        .await?;

        claimed_count.ok_or_else(|| {
            RedeemError::Internal(format!("已领取数将超过兑换码总数: benefit_id={}", benefit_id))
        })
    }

    /// 条件更新权益状态
    pub async fn transition_status(
        &self,
        benefit_id: i64,
        from: BenefitStatus,
        to: BenefitStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE benefits
            SET status = $3
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(benefit_id)
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
