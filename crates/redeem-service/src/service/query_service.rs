//! 查询服务
//!
//! 只读操作：创建者的权益列表、用户的领取历史、权益领取明细、面向访问者的权益详情

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{RedeemError, Result};
use crate::lifecycle::Availability;
use crate::models::{Benefit, ClaimStatus, UserClaimRecord};
use crate::repository::BenefitStore;
use crate::service::dto::{BenefitClaimReport, BenefitDetail};

/// 查询服务
pub struct QueryService {
    store: Arc<dyn BenefitStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn BenefitStore>) -> Self {
        Self { store }
    }

    /// 创建者的全部权益，最新创建的在前
    #[instrument(skip(self))]
    pub async fn list_my_benefits(&self, creator_id: i64) -> Result<Vec<Benefit>> {
        self.store.list_benefits_by_creator(creator_id).await
    }

    /// 用户的领取历史，最新的在前
    #[instrument(skip(self))]
    pub async fn list_my_claims(&self, user_id: i64) -> Result<Vec<UserClaimRecord>> {
        self.store.list_claims_by_user(user_id).await
    }

    /// 权益的领取明细与库存统计，仅创建者可查看
    #[instrument(skip(self), fields(link_token = %link_token))]
    pub async fn list_benefit_claims(
        &self,
        requester_id: i64,
        link_token: Uuid,
    ) -> Result<BenefitClaimReport> {
        let benefit = self
            .store
            .find_benefit_by_token(link_token)
            .await?
            .filter(|b| b.is_owned_by(requester_id))
            .ok_or_else(|| RedeemError::BenefitNotFound(link_token.to_string()))?;

        let inventory = self.store.code_inventory(benefit.id).await?;
        let claims = self.store.list_claims_by_benefit(benefit.id).await?;

        Ok(BenefitClaimReport {
            benefit,
            inventory,
            claims,
        })
    }

    /// 权益详情及当前访问者的领取状态
    ///
    /// 已删除的权益视为不存在；暂停、过期优先于"已领取"
    #[instrument(skip(self), fields(link_token = %link_token))]
    pub async fn benefit_detail(
        &self,
        link_token: Uuid,
        viewer_id: Option<i64>,
    ) -> Result<BenefitDetail> {
        let benefit = self
            .store
            .find_benefit_by_token(link_token)
            .await?
            .ok_or_else(|| RedeemError::BenefitNotFound(link_token.to_string()))?;

        let claim_status = match benefit.availability(Utc::now()) {
            Availability::Deleted => {
                return Err(RedeemError::BenefitNotFound(link_token.to_string()));
            }
            Availability::Expired => ClaimStatus::Expired,
            Availability::Paused => ClaimStatus::Paused,
            Availability::Claimable => {
                let claimed = match viewer_id {
                    Some(user_id) => self.store.has_claim(user_id, benefit.id).await?,
                    None => false,
                };
                if claimed {
                    ClaimStatus::Claimed
                } else if benefit.remaining() == 0 {
                    ClaimStatus::Depleted
                } else {
                    ClaimStatus::Available
                }
            }
        };

        Ok(BenefitDetail {
            benefit,
            claim_status,
        })
    }
}
