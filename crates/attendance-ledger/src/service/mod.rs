//! 服务层
//!
//! - `identifier`: 标识符分类与批量解析
//! - `coordinator`: 出勤事务协调器（唯一写入方）
//! - `query_service`: 只读查询
//! - `dto`: 数据传输对象定义

pub mod coordinator;
pub mod dto;
pub mod identifier;
pub mod query_service;

pub use coordinator::AttendanceCoordinator;
pub use dto::*;
pub use identifier::{Identifier, IdentifierResolver, Resolution};
pub use query_service::AttendanceQueryService;
