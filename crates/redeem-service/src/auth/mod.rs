//! 认证模块
//!
//! 校验 Bearer Token 并解析出 (user_id, provider)

mod jwt;

pub use jwt::{AuthError, Claims, JwtConfig, JwtManager};

/// 已认证的调用者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
    /// 本次会话的登录方式
    pub provider: String,
}

impl TryFrom<Claims> for AuthUser {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: claims.user_id()?,
            provider: claims.provider,
        })
    }
}

/// 可选认证路由上的访问者，未携带 Token 时为 None
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<AuthUser>);
