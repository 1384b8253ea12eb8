//! HTTP 请求处理器
//!
//! - `benefit`: 创建者侧接口（创建、列表、状态变更、领取明细）
//! - `claim`: 领取侧接口（详情、领取、领取历史）

pub mod benefit;
pub mod claim;

use axum::http::{HeaderMap, header};
use uuid::Uuid;

use crate::error::{RedeemError, Result};
use crate::state::AppState;

/// 解析路径中的分享链接标识，格式错误按不存在处理
pub(crate) fn parse_link_token(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| RedeemError::BenefitNotFound(raw.to_string()))
}

/// 领取链接的站点地址：优先使用配置，否则按请求 Host 拼接
pub(crate) fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(base) = &state.public_base_url {
        return base.trim_end_matches('/').to_string();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{}", host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_token_reads_as_not_found() {
        let err = parse_link_token("not-a-uuid").unwrap_err();
        assert_eq!(err.error_code(), "BENEFIT_NOT_FOUND");
        assert!(parse_link_token("6f1c1d4e-35a4-4a4b-9f55-0b6c1c1e2f3a").is_ok());
    }
}
