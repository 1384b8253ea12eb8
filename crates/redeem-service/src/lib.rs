//! 兑换码领取服务
//!
//! 创建者上传一批一次性兑换码生成权益，通过分享链接分发；
//! 已认证用户按资格限制领取，每人每权益至多一个。
//!
//! ## 核心保证
//!
//! - 一个兑换码只会被分配一次
//! - 同一用户对同一权益只能领取一次
//! - 已领取数与已分配的兑换码数量始终一致，且不超过总数
//!
//! 以上全部依赖事务语义（条件更新、SKIP LOCKED、唯一约束）实现，不使用应用层锁。
//!
//! ## 模块结构
//!
//! - `models`: 领域模型
//! - `eligibility`: 领取资格判定
//! - `lifecycle`: 权益状态机与可领取性
//! - `repository`: 存储抽象与 PostgreSQL / 内存实现
//! - `service`: 创建、领取、状态变更、查询服务
//! - `auth` / `middleware` / `handlers` / `routes` / `state`: HTTP 层
//! - `error`: 错误类型定义

pub mod auth;
pub mod eligibility;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;

pub use error::{ErrorKind, RedeemError, Result};
pub use models::{
    AllowedProviders, Benefit, BenefitStatus, Claim, ClaimConditions, ClaimStatus,
    ClaimantProfile, CodeStatus, RedemptionCode,
};
pub use repository::{BenefitStore, MemoryBenefitStore, PgBenefitStore};
pub use service::{
    AuthoringService, ClaimOutcome, ClaimRequest, ClaimService, CreateBenefitRequest,
    LifecycleService, QueryService,
};
