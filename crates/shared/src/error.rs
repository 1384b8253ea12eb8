//! 基础设施错误处理模块
//!
//! 定义连接池、迁移与配置加载等基础设施层的错误类型。业务错误由各服务自行定义。

use thiserror::Error;

/// 基础设施错误类型
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库迁移失败: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, InfraError>;

impl InfraError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::Migration(_) => "MIGRATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误
    ///
    /// 仅连接层面的瞬时故障可重试，迁移和配置错误需要人工介入
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Database(sqlx::Error::PoolTimedOut)
                | Self::Database(sqlx::Error::Io(_))
                | Self::Database(sqlx::Error::PoolClosed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = InfraError::Internal("boom".to_string());
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert_eq!(
            InfraError::Database(sqlx::Error::PoolTimedOut).code(),
            "DATABASE_ERROR"
        );
    }

    #[test]
    fn test_is_retryable() {
        let db_err = InfraError::Database(sqlx::Error::PoolTimedOut);
        assert!(db_err.is_retryable());

        let row_err = InfraError::Database(sqlx::Error::RowNotFound);
        assert!(!row_err.is_retryable());

        assert!(!InfraError::Internal("x".to_string()).is_retryable());
    }
}
