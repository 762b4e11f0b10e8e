//! 奖项与授奖记录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 奖项
///
/// 用户积分达到 `points` 时获得该奖项
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Award {
    pub id: i64,
    pub name: String,
    #[sqlx(default)]
    pub description: Option<String>,
    pub points: i32,
    #[sqlx(default)]
    pub icon_url: Option<String>,
}

impl Award {
    /// 给定积分是否满足门槛
    pub fn is_qualified(&self, current_points: i32) -> bool {
        self.points <= current_points
    }
}

/// 用户已获得的奖项，只增不删
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserAward {
    pub user_id: i64,
    pub award_id: i64,
    pub granted_at: DateTime<Utc>,
}

/// 用户已获得奖项的查询行（带奖项信息）
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EarnedAwardRow {
    pub user_id: i64,
    pub award_id: i64,
    pub name: String,
    pub points: i32,
    #[sqlx(default)]
    pub icon_url: Option<String>,
    pub granted_at: DateTime<Utc>,
}
