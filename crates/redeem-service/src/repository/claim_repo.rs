//! 领取记录仓储
//!
//! 提供 claims 表的数据访问，以及领取人档案（users 表）的只读查询

use sqlx::{PgConnection, PgPool};

use crate::error::{RedeemError, Result};
use crate::models::{BenefitClaimRecord, Claim, ClaimantProfile, NewClaim, UserClaimRecord};

/// (user_id, benefit_id) 唯一约束名，与迁移脚本保持一致
const USER_BENEFIT_UNIQUE: &str = "claims_user_benefit_unique";

/// 领取记录仓储
pub struct ClaimRepository {
    pool: PgPool,
}

impl ClaimRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 用户是否已领取过该权益
    pub async fn exists(&self, user_id: i64, benefit_id: i64) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        Self::exists_in_tx(&mut *conn, user_id, benefit_id).await
    }

    /// 在事务中检查用户是否已领取过该权益
    pub async fn exists_in_tx(tx: &mut PgConnection, user_id: i64, benefit_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM claims WHERE user_id = $1 AND benefit_id = $2)",
        )
        .bind(user_id)
        .bind(benefit_id)
        .fetch_one(tx)
        .await?;

        Ok(exists)
    }

    /// 在事务中写入领取记录
    ///
    /// 唯一约束是"每人每权益一次"的最终保障，冲突时转换为 AlreadyClaimed
    pub async fn insert_in_tx(tx: &mut PgConnection, claim: &NewClaim) -> Result<Claim> {
        sqlx::query_as::<_, Claim>(
            r#"
            INSERT INTO claims (user_id, benefit_id, code_id, provider, claimed_at, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, benefit_id, code_id, provider, claimed_at, ip_address, user_agent
            "#,
        )
        .bind(claim.user_id)
        .bind(claim.benefit_id)
        .bind(claim.code_id)
        .bind(&claim.provider)
        .bind(claim.claimed_at)
        .bind(&claim.ip_address)
        .bind(&claim.user_agent)
        .fetch_one(tx)
        .await
        .map_err(|err| {
            let duplicate = err.as_database_error().is_some_and(|db| {
                db.is_unique_violation() && db.constraint() == Some(USER_BENEFIT_UNIQUE)
            });
            if duplicate {
                RedeemError::AlreadyClaimed {
                    user_id: claim.user_id,
                    benefit_id: claim.benefit_id,
                }
            } else {
                RedeemError::from(err)
            }
        })
    }

    /// 用户的领取历史，最新的在前
    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<UserClaimRecord>> {
        let records = sqlx::query_as::<_, UserClaimRecord>(
            r#"
            SELECT c.id AS claim_id, b.link_token, b.title, b.description,
                   rc.code, c.provider, c.claimed_at
            FROM claims c
            JOIN benefits b ON b.id = c.benefit_id
            JOIN redemption_codes rc ON rc.id = c.code_id
            WHERE c.user_id = $1
            ORDER BY c.claimed_at DESC, c.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// 权益下的领取明细，最新的在前
    pub async fn list_by_benefit(&self, benefit_id: i64) -> Result<Vec<BenefitClaimRecord>> {
        let records = sqlx::query_as::<_, BenefitClaimRecord>(
            r#"
            SELECT c.id AS claim_id, c.user_id, u.username, rc.code,
                   c.provider, c.claimed_at, c.ip_address
            FROM claims c
            JOIN users u ON u.id = c.user_id
            JOIN redemption_codes rc ON rc.id = c.code_id
            WHERE c.benefit_id = $1
            ORDER BY c.claimed_at DESC, c.id DESC
            "#,
        )
        .bind(benefit_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// 在事务中读取领取人档案
    pub async fn find_claimant_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
    ) -> Result<Option<ClaimantProfile>> {
        let profile = sqlx::query_as::<_, ClaimantProfile>(
            "SELECT id, username, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(tx)
        .await?;

        Ok(profile)
    }
}
