//! 兑换服务错误类型
//!
//! 定义领取引擎的业务错误和系统错误。业务错误对应领取流程中可预期的拒绝原因，
//! 系统错误统一归入 [`ErrorKind::ServerError`]。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// 错误分类
///
/// 调用方按分类决定展示与重试策略，不关心具体变体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    BenefitPaused,
    BenefitExpired,
    ProviderNotAllowed,
    AccountTooNew,
    AlreadyClaimed,
    NoCodeAvailable,
    ServerError,
}

/// 兑换服务错误类型
#[derive(Debug, Error)]
pub enum RedeemError {
    // === 输入错误 ===
    #[error("参数校验失败: {0}")]
    InvalidInput(String),

    // === 权益状态错误 ===
    #[error("权益不存在: {0}")]
    BenefitNotFound(String),

    #[error("权益已暂停领取: {0}")]
    BenefitPaused(Uuid),

    #[error("权益已过期: {0}")]
    BenefitExpired(Uuid),

    // === 资格错误 ===
    #[error("当前登录方式不允许领取该权益: provider={provider}")]
    ProviderNotAllowed { provider: String },

    #[error("账号注册时间不足: 需要 {required_days} 天, 实际 {actual_days} 天")]
    AccountTooNew { required_days: i32, actual_days: i64 },

    // === 领取错误 ===
    #[error("已领取过该权益: user_id={user_id}")]
    AlreadyClaimed { user_id: i64, benefit_id: i64 },

    #[error("兑换码已领完: {0}")]
    NoCodeAvailable(Uuid),

    // === 系统错误 ===
    #[error("并发冲突，请重试")]
    ConcurrencyConflict,

    #[error("领取事务执行超时")]
    TransactionTimeout,

    #[error("数据库错误: {0}")]
    Database(#[source] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 兑换服务 Result 类型别名
pub type Result<T> = std::result::Result<T, RedeemError>;

/// 可重试的 PostgreSQL 错误码：序列化失败、死锁、锁不可用
const CONFLICT_SQLSTATES: [&str; 3] = ["40001", "40P01", "55P03"];

/// 语句超时（statement_timeout 触发）
const QUERY_CANCELED_SQLSTATE: &str = "57014";

impl From<sqlx::Error> for RedeemError {
    fn from(err: sqlx::Error) -> Self {
        let sqlstate = err
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code.into_owned());

        match sqlstate.as_deref() {
            Some(code) if CONFLICT_SQLSTATES.contains(&code) => Self::ConcurrencyConflict,
            Some(QUERY_CANCELED_SQLSTATE) => Self::TransactionTimeout,
            _ => Self::Database(err),
        }
    }
}

impl RedeemError {
    /// 错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::BenefitNotFound(_) => ErrorKind::NotFound,
            Self::BenefitPaused(_) => ErrorKind::BenefitPaused,
            Self::BenefitExpired(_) => ErrorKind::BenefitExpired,
            Self::ProviderNotAllowed { .. } => ErrorKind::ProviderNotAllowed,
            Self::AccountTooNew { .. } => ErrorKind::AccountTooNew,
            Self::AlreadyClaimed { .. } => ErrorKind::AlreadyClaimed,
            Self::NoCodeAvailable(_) => ErrorKind::NoCodeAvailable,
            Self::ConcurrencyConflict
            | Self::TransactionTimeout
            | Self::Database(_)
            | Self::Serialization(_)
            | Self::Internal(_) => ErrorKind::ServerError,
        }
    }

    /// 检查是否为可重试的错误
    ///
    /// 只有事务冲突类错误会被透明重试，其余系统错误原样返回
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict)
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        self.kind() != ErrorKind::ServerError
    }

    /// 获取错误码（用于 API 响应与指标标签）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::BenefitNotFound(_) => "BENEFIT_NOT_FOUND",
            Self::BenefitPaused(_) => "BENEFIT_PAUSED",
            Self::BenefitExpired(_) => "BENEFIT_EXPIRED",
            Self::ProviderNotAllowed { .. } => "PROVIDER_NOT_ALLOWED",
            Self::AccountTooNew { .. } => "ACCOUNT_TOO_NEW",
            Self::AlreadyClaimed { .. } => "ALREADY_CLAIMED",
            Self::NoCodeAvailable(_) => "NO_CODE_AVAILABLE",
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            Self::TransactionTimeout => "TRANSACTION_TIMEOUT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::BenefitNotFound(_) => StatusCode::NOT_FOUND,
            Self::BenefitExpired(_) => StatusCode::GONE,
            Self::ProviderNotAllowed { .. } | Self::AccountTooNew { .. } => StatusCode::FORBIDDEN,
            Self::BenefitPaused(_) | Self::AlreadyClaimed { .. } | Self::NoCodeAvailable(_) => {
                StatusCode::CONFLICT
            }
            Self::ConcurrencyConflict => StatusCode::SERVICE_UNAVAILABLE,
            Self::TransactionTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Database(_) | Self::Serialization(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RedeemError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = if self.is_business_error() {
            self.to_string()
        } else {
            tracing::error!(code = self.error_code(), error = %self, "请求处理失败");
            "服务内部错误，请稍后重试".to_string()
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for RedeemError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::InvalidInput(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        assert!(RedeemError::ConcurrencyConflict.is_retryable());
        assert!(!RedeemError::TransactionTimeout.is_retryable());
        assert!(!RedeemError::Database(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!RedeemError::NoCodeAvailable(Uuid::new_v4()).is_retryable());
    }

    #[test]
    fn test_error_is_business_error() {
        assert!(RedeemError::BenefitPaused(Uuid::new_v4()).is_business_error());
        assert!(
            RedeemError::AlreadyClaimed {
                user_id: 1,
                benefit_id: 2
            }
            .is_business_error()
        );
        assert!(!RedeemError::Internal("boom".to_string()).is_business_error());
        assert!(!RedeemError::ConcurrencyConflict.is_business_error());
    }

    #[test]
    fn test_error_kind_and_code() {
        let token = Uuid::new_v4();
        let cases = vec![
            (
                RedeemError::InvalidInput("title".into()),
                ErrorKind::InvalidInput,
                "INVALID_INPUT",
            ),
            (
                RedeemError::BenefitNotFound(token.to_string()),
                ErrorKind::NotFound,
                "BENEFIT_NOT_FOUND",
            ),
            (
                RedeemError::BenefitPaused(token),
                ErrorKind::BenefitPaused,
                "BENEFIT_PAUSED",
            ),
            (
                RedeemError::BenefitExpired(token),
                ErrorKind::BenefitExpired,
                "BENEFIT_EXPIRED",
            ),
            (
                RedeemError::ProviderNotAllowed {
                    provider: "google".into(),
                },
                ErrorKind::ProviderNotAllowed,
                "PROVIDER_NOT_ALLOWED",
            ),
            (
                RedeemError::AccountTooNew {
                    required_days: 30,
                    actual_days: 3,
                },
                ErrorKind::AccountTooNew,
                "ACCOUNT_TOO_NEW",
            ),
            (
                RedeemError::NoCodeAvailable(token),
                ErrorKind::NoCodeAvailable,
                "NO_CODE_AVAILABLE",
            ),
            (
                RedeemError::TransactionTimeout,
                ErrorKind::ServerError,
                "TRANSACTION_TIMEOUT",
            ),
        ];

        for (err, kind, code) in cases {
            assert_eq!(err.kind(), kind, "{err}");
            assert_eq!(err.error_code(), code);
        }
    }

    #[test]
    fn test_plain_sqlx_error_maps_to_database() {
        let err = RedeemError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, RedeemError::Database(_)));
        assert_eq!(err.kind(), ErrorKind::ServerError);
    }

    #[test]
    fn test_error_display() {
        let err = RedeemError::AccountTooNew {
            required_days: 30,
            actual_days: 7,
        };
        assert!(err.to_string().contains("30"));
        assert!(err.to_string().contains("7"));
    }

    #[test]
    fn test_status_code_mapping() {
        let token = Uuid::new_v4();
        let cases = vec![
            (RedeemError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (RedeemError::BenefitNotFound(token.to_string()), StatusCode::NOT_FOUND),
            (RedeemError::BenefitPaused(token), StatusCode::CONFLICT),
            (RedeemError::BenefitExpired(token), StatusCode::GONE),
            (
                RedeemError::ProviderNotAllowed {
                    provider: "google".into(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                RedeemError::AccountTooNew {
                    required_days: 1,
                    actual_days: 0,
                },
                StatusCode::FORBIDDEN,
            ),
            (
                RedeemError::AlreadyClaimed {
                    user_id: 1,
                    benefit_id: 1,
                },
                StatusCode::CONFLICT,
            ),
            (RedeemError::NoCodeAvailable(token), StatusCode::CONFLICT),
            (RedeemError::ConcurrencyConflict, StatusCode::SERVICE_UNAVAILABLE),
            (RedeemError::TransactionTimeout, StatusCode::GATEWAY_TIMEOUT),
            (RedeemError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{err}");
            assert_eq!(err.into_response().status(), status);
        }
    }
}
