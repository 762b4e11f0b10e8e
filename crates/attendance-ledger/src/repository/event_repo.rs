//! 活动仓储
//!
//! 出勤操作以 FOR SHARE 锁定活动行，删除活动以 FOR UPDATE 锁定，
//! 保证正在删除的活动不会再写入出勤。

use sqlx::{PgConnection, PgPool};

use crate::error::Result;
use crate::models::Event;

pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 查询操作 ====================

    pub async fn get_event(&self, id: i64) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            SELECT id, name, description, location, date_time, organizer_id,
                   points_allocation, image_url, created_at, updated_at
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    // ==================== 事务操作 ====================

    /// 在事务中读取活动（共享锁）
    pub async fn get_for_share_in_tx(tx: &mut PgConnection, id: i64) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            SELECT id, name, description, location, date_time, organizer_id,
                   points_allocation, image_url, created_at, updated_at
            FROM events
            WHERE id = $1
            FOR SHARE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        Ok(event)
    }

    /// 在事务中读取活动（排他锁）
    pub async fn get_for_update_in_tx(tx: &mut PgConnection, id: i64) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            SELECT id, name, description, location, date_time, organizer_id,
                   points_allocation, image_url, created_at, updated_at
            FROM events
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        Ok(event)
    }

    /// 在事务中删除活动及其奖项关联
    ///
    /// 调用前必须已清空该活动的出勤记录
    pub async fn delete_in_tx(tx: &mut PgConnection, id: i64) -> Result<u64> {
        sqlx::query("DELETE FROM event_awards WHERE event_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        Ok(result.rows_affected())
    }
}
