//! 数据传输对象
//!
//! 响应体直接复用账本的 DTO

pub mod request;

pub use request::IdentifiersRequest;
