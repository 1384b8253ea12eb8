//! 权益创建服务
//!
//! 清洗提交的兑换码（去首尾空白、丢弃空项、按首次出现去重），
//! 在同一事务中写入权益与全部兑换码。

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use redeem_shared::observability::metrics;

use crate::error::{RedeemError, Result};
use crate::models::{AllowedProviders, NewBenefit};
use crate::repository::BenefitStore;
use crate::service::dto::{AuthoredBenefit, CreateBenefitRequest};
use crate::service::finish_tx;

/// 标题与单个兑换码的最大长度（与表结构的 VARCHAR(255) 一致）
const MAX_FIELD_CHARS: usize = 255;

/// 默认有效期
const DEFAULT_VALIDITY: Months = Months::new(12);

/// 清洗后的兑换码
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCodes {
    /// 保持提交顺序
    pub codes: Vec<String>,
    pub submitted: usize,
    pub blank_discarded: usize,
    pub duplicates_removed: usize,
}

/// 清洗兑换码列表
///
/// 去重区分大小写，保留首次出现的位置
pub fn normalize_codes<S: AsRef<str>>(raw: &[S]) -> NormalizedCodes {
    let mut seen = HashSet::new();
    let mut codes = Vec::with_capacity(raw.len());
    let mut blank_discarded = 0;
    let mut duplicates_removed = 0;

    for code in raw {
        let trimmed = code.as_ref().trim();
        if trimmed.is_empty() {
            blank_discarded += 1;
        } else if seen.insert(trimmed) {
            codes.push(trimmed.to_string());
        } else {
            duplicates_removed += 1;
        }
    }

    NormalizedCodes {
        codes,
        submitted: raw.len(),
        blank_discarded,
        duplicates_removed,
    }
}

/// 权益创建服务
pub struct AuthoringService {
    store: Arc<dyn BenefitStore>,
}

impl AuthoringService {
    pub fn new(store: Arc<dyn BenefitStore>) -> Self {
        Self { store }
    }

    /// 创建权益及其兑换码
    #[instrument(skip(self, request), fields(creator_id = %request.creator_id, submitted = request.codes.len()))]
    pub async fn create_benefit(&self, request: CreateBenefitRequest) -> Result<AuthoredBenefit> {
        let now = Utc::now();
        let normalized = normalize_codes(&request.codes);
        let new_benefit = Self::prepare(&request, &normalized.codes, now)?;

        let mut tx = self.store.begin().await?;
        let result = async {
            let benefit = tx.insert_benefit(&new_benefit).await?;
            let inserted = tx.insert_codes(benefit.id, &normalized.codes, now).await?;
            if inserted != normalized.codes.len() as u64 {
                return Err(RedeemError::Internal(format!(
                    "兑换码写入数量不一致: expected={}, actual={}",
                    normalized.codes.len(),
                    inserted
                )));
            }
            Ok(benefit)
        }
        .await;
        let benefit = finish_tx(tx, result).await?;

        metrics::record_benefit_created(benefit.total_count as u64);
        info!(
            link_token = %benefit.link_token,
            total_count = benefit.total_count,
            blank_discarded = normalized.blank_discarded,
            duplicates_removed = normalized.duplicates_removed,
            "权益创建成功"
        );

        Ok(AuthoredBenefit {
            benefit,
            submitted_count: normalized.submitted,
            blank_discarded: normalized.blank_discarded,
            duplicates_removed: normalized.duplicates_removed,
        })
    }

    /// 校验请求并构造待写入的权益
    fn prepare(
        request: &CreateBenefitRequest,
        codes: &[String],
        now: DateTime<Utc>,
    ) -> Result<NewBenefit> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(RedeemError::InvalidInput("标题不能为空".to_string()));
        }
        if title.chars().count() > MAX_FIELD_CHARS {
            return Err(RedeemError::InvalidInput(format!(
                "标题长度不能超过 {} 个字符",
                MAX_FIELD_CHARS
            )));
        }
        if request.min_account_age_days < 0 {
            return Err(RedeemError::InvalidInput(
                "最小账号注册天数不能为负数".to_string(),
            ));
        }

        if codes.is_empty() {
            return Err(RedeemError::InvalidInput("至少需要一个有效的兑换码".to_string()));
        }
        if let Some(code) = codes.iter().find(|c| c.chars().count() > MAX_FIELD_CHARS) {
            return Err(RedeemError::InvalidInput(format!(
                "兑换码长度不能超过 {} 个字符: {}...",
                MAX_FIELD_CHARS,
                code.chars().take(16).collect::<String>()
            )));
        }
        let total_count = i32::try_from(codes.len())
            .map_err(|_| RedeemError::InvalidInput("兑换码数量过多".to_string()))?;

        let expires_at = match request.expires_at {
            Some(at) => at,
            None => now
                .checked_add_months(DEFAULT_VALIDITY)
                .ok_or_else(|| RedeemError::Internal("无法计算默认过期时间".to_string()))?,
        };

        let description = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(NewBenefit {
            link_token: Uuid::new_v4(),
            title: title.to_string(),
            description,
            creator_id: request.creator_id,
            total_count,
            allowed_providers: AllowedProviders::new(&request.allowed_providers),
            min_account_age_days: request.min_account_age_days,
            claim_conditions: request.claim_conditions.clone(),
            created_at: now,
            expires_at,
        })
    }
}
