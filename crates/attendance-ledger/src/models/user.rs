//! 用户实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{UserRole, UserStatus};

/// 用户
///
/// `current_points` 只由积分账本修改
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub grad_year: i32,
    pub current_points: i32,
    pub role: UserRole,
    pub status: UserStatus,
    #[sqlx(default)]
    pub department: Option<String>,
    #[sqlx(default)]
    pub title: Option<String>,
    pub registration_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 出勤名单中的用户摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttendeeSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
}
