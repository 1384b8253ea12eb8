//! 中间件模块
//!
//! 提供认证与请求来源提取中间件

mod auth;
mod client;

pub use auth::auth_middleware;
pub use client::{ClientOrigin, client_origin};
