//! 中间件模块

pub mod auth;
pub mod role;

pub use auth::auth_middleware;
pub use role::require_manager;
