//! 出勤仓储
//!
//! 写入路径依赖 `uq_attendances_user_event` 唯一约束：并发事务插入同一 (user, event)
//! 时，后提交者的插入被 `ON CONFLICT DO NOTHING` 吸收，`RETURNING` 只返回真正写入的用户。

use std::collections::HashSet;

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::error::Result;
use crate::models::{AttendeeSummary, NewAttendance};

pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 查询操作 ====================

    /// 列出活动的出勤用户
    pub async fn list_attendees(&self, event_id: i64) -> Result<Vec<AttendeeSummary>> {
        let attendees = sqlx::query_as::<_, AttendeeSummary>(
            r#"
            SELECT u.id, u.name, u.email
            FROM attendances a
            JOIN users u ON u.id = a.user_id
            WHERE a.event_id = $1
            ORDER BY a.scanned_time, u.id
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attendees)
    }

    // ==================== 事务操作 ====================

    /// 候选用户中已出勤的用户
    pub async fn existing_attendees_in_tx(
        tx: &mut PgConnection,
        event_id: i64,
        user_ids: &[i64],
    ) -> Result<HashSet<i64>> {
        if user_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let rows: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT user_id
            FROM attendances
            WHERE event_id = $1 AND user_id = ANY($2)
            "#,
        )
        .bind(event_id)
        .bind(user_ids)
        .fetch_all(&mut *tx)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// 分批插入出勤记录，所有批次共用同一事务连接
    ///
    /// 返回实际写入的用户 ID（已存在的组合被跳过）
    pub async fn insert_batch_in_tx(
        tx: &mut PgConnection,
        rows: &[NewAttendance],
        chunk_size: usize,
    ) -> Result<Vec<i64>> {
        let mut inserted = Vec::with_capacity(rows.len());

        for chunk in rows.chunks(chunk_size.max(1)) {
            let mut builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO attendances (user_id, event_id, scanned_time) ");
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.user_id)
                    .push_bind(row.event_id)
                    .push_bind(row.scanned_time);
            });
            builder.push(" ON CONFLICT (user_id, event_id) DO NOTHING RETURNING user_id");

            let ids: Vec<i64> = builder
                .build_query_scalar::<i64>()
                .fetch_all(&mut *tx)
                .await?;
            inserted.extend(ids);
        }

        Ok(inserted)
    }

    /// 删除指定用户在活动中的出勤，返回被删除记录的用户 ID
    pub async fn delete_by_event_and_users_in_tx(
        tx: &mut PgConnection,
        event_id: i64,
        user_ids: &[i64],
    ) -> Result<Vec<i64>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let removed: Vec<i64> = sqlx::query_scalar(
            r#"
            DELETE FROM attendances
            WHERE event_id = $1 AND user_id = ANY($2)
            RETURNING user_id
            "#,
        )
        .bind(event_id)
        .bind(user_ids)
        .fetch_all(&mut *tx)
        .await?;

        Ok(removed)
    }

    /// 删除活动的全部出勤，返回被删除记录的用户 ID
    pub async fn delete_by_event_in_tx(tx: &mut PgConnection, event_id: i64) -> Result<Vec<i64>> {
        let removed: Vec<i64> = sqlx::query_scalar(
            r#"
            DELETE FROM attendances
            WHERE event_id = $1
            RETURNING user_id
            "#,
        )
        .bind(event_id)
        .fetch_all(&mut *tx)
        .await?;

        Ok(removed)
    }
}
