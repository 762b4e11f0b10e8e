//! Passport 出勤积分 REST API
//!
//! 在出勤账本之上提供 HTTP 接口，负责认证、角色校验和错误到 HTTP 状态码的映射。
//!
//! ## 模块结构
//!
//! - `auth`: JWT Token 签发与验证
//! - `dto`: 请求体定义
//! - `error`: API 错误类型
//! - `handlers`: HTTP 请求处理器
//! - `middleware`: 认证与角色中间件
//! - `routes`: 路由配置
//! - `state`: 应用状态

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, Result};
pub use state::AppState;
