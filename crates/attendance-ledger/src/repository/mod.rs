//! 数据库仓储层
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - `*_in_tx` 方法接收调用方的事务连接，事务边界由协调器决定
//! - 标识符解析依赖 `UserDirectory` trait，支持 mock 测试

mod attendance_repo;
mod award_repo;
mod event_repo;
mod points_repo;
mod traits;
mod user_repo;

pub use attendance_repo::AttendanceRepository;
pub use award_repo::AwardRepository;
pub use event_repo::EventRepository;
pub use points_repo::PointsLedgerRepository;
pub use traits::*;
pub use user_repo::UserRepository;
