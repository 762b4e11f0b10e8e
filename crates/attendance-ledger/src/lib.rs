//! 出勤积分账本
//!
//! 把活动出勤换算为用户积分，并在积分越过奖项门槛时授予奖项。
//!
//! ## 核心保证
//!
//! - **不重复计数**：同一用户在同一活动至多一条出勤，重复登记不会再次加分
//! - **不丢失更新**：积分只做增量更新，并发登记互不覆盖
//! - **全部或全无**：登记、加分、授奖在同一事务内，任一步失败全部回滚
//! - **奖项只增不减**：移除出勤或删除活动都不会撤回已授予的奖项
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `repository`: 数据库仓储层
//! - `service`: 标识符解析、事务协调与查询

pub mod error;
pub mod models;
pub mod repository;
pub mod service;

pub use error::{LedgerError, Result};
pub use models::*;
pub use repository::{
    AttendanceRepository, AwardRepository, EventRepository, PointsLedgerRepository,
    UserDirectory, UserRepository,
};
pub use service::{
    AttendanceCoordinator, AttendanceQueryService, Identifier, IdentifierResolver, Resolution,
    dto,
};
