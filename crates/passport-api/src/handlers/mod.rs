//! HTTP 请求处理器模块

pub mod attendance;
pub mod event;
pub mod health;
