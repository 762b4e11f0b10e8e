//! 出勤查询服务
//!
//! 只读查询，不经过协调器事务

use tracing::instrument;

use crate::error::{LedgerError, Result};
use crate::models::AttendeeSummary;
use crate::repository::{AttendanceRepository, EventRepository};

pub struct AttendanceQueryService {
    event_repo: EventRepository,
    attendance_repo: AttendanceRepository,
}

impl AttendanceQueryService {
    pub fn new(event_repo: EventRepository, attendance_repo: AttendanceRepository) -> Self {
        Self {
            event_repo,
            attendance_repo,
        }
    }

    /// 列出活动的出勤用户，活动不存在时返回 NotFound
    #[instrument(skip(self))]
    pub async fn list_attendees(&self, event_id: i64) -> Result<Vec<AttendeeSummary>> {
        if event_id <= 0 {
            return Err(LedgerError::InvalidInput(format!(
                "活动 ID 必须为正整数: {}",
                event_id
            )));
        }

        self.event_repo
            .get_event(event_id)
            .await?
            .ok_or_else(|| LedgerError::event_not_found(event_id))?;

        self.attendance_repo.list_attendees(event_id).await
    }
}
