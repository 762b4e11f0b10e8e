//! 认证模块
//!
//! 提供 JWT Token 生成和验证功能

mod jwt;

pub use jwt::{Claims, JwtManager};
