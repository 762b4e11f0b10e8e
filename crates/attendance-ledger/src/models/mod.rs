//! 账本领域模型

pub mod attendance;
pub mod award;
pub mod enums;
pub mod event;
pub mod user;

pub use attendance::{Attendance, NewAttendance};
pub use award::{Award, EarnedAwardRow, UserAward};
pub use enums::{UserRole, UserStatus};
pub use event::Event;
pub use user::{AttendeeSummary, User};
