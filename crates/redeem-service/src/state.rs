//! 应用状态定义
//!
//! 包含 Axum 路由共享的服务实例与认证组件

use std::sync::Arc;

use redeem_shared::config::{AuthConfig, ClaimConfig};

use crate::auth::{JwtConfig, JwtManager};
use crate::repository::BenefitStore;
use crate::service::{AuthoringService, ClaimService, LifecycleService, QueryService};

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub authoring_service: Arc<AuthoringService>,
    pub claim_service: Arc<ClaimService>,
    pub lifecycle_service: Arc<LifecycleService>,
    pub query_service: Arc<QueryService>,
    pub jwt_manager: Arc<JwtManager>,
    /// 领取链接的站点地址，未配置时按请求 Host 推导
    pub public_base_url: Option<String>,
}

impl AppState {
    /// 基于同一存储构建全部服务
    pub fn new(
        store: Arc<dyn BenefitStore>,
        auth: &AuthConfig,
        claim: &ClaimConfig,
        public_base_url: Option<String>,
    ) -> Self {
        Self {
            authoring_service: Arc::new(AuthoringService::new(store.clone())),
            claim_service: Arc::new(ClaimService::new(store.clone(), claim)),
            lifecycle_service: Arc::new(LifecycleService::new(store.clone())),
            query_service: Arc::new(QueryService::new(store)),
            jwt_manager: Arc::new(JwtManager::new(JwtConfig::from(auth))),
            public_base_url,
        }
    }
}
