//! 活动实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 活动
///
/// 账本只读取活动，`points_allocation` 为每位出勤者获得的积分
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: i64,
    pub name: String,
    #[sqlx(default)]
    pub description: Option<String>,
    #[sqlx(default)]
    pub location: Option<String>,
    pub date_time: DateTime<Utc>,
    pub organizer_id: i64,
    pub points_allocation: i32,
    #[sqlx(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
