//! 出勤记录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 出勤记录，每个 (user_id, event_id) 至多一条
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attendance {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub scanned_time: DateTime<Utc>,
}

/// 待写入的出勤记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewAttendance {
    pub user_id: i64,
    pub event_id: i64,
    pub scanned_time: DateTime<Utc>,
}

impl NewAttendance {
    /// 为同一批次的用户生成统一时间戳的出勤记录
    pub fn batch(event_id: i64, user_ids: &[i64], scanned_time: DateTime<Utc>) -> Vec<Self> {
        user_ids
            .iter()
            .map(|&user_id| Self {
                user_id,
                event_id,
                scanned_time,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_uses_uniform_timestamp() {
        let now = Utc::now();
        let rows = NewAttendance::batch(7, &[1, 2, 3], now);

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.event_id == 7 && r.scanned_time == now));
        assert_eq!(
            rows.iter().map(|r| r.user_id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }
}
