//! 积分账本仓储
//!
//! 积分只做增量更新（`current_points = current_points + $delta`），从不先读后写，
//! 并发事务对同一用户的调整因此不会丢失。余额不做下限截断。

use sqlx::PgConnection;

use crate::error::Result;

pub struct PointsLedgerRepository;

impl PointsLedgerRepository {
    /// 对一组用户统一调整积分，返回受影响的用户数
    pub async fn adjust_in_tx(tx: &mut PgConnection, user_ids: &[i64], delta: i32) -> Result<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE users
            SET current_points = current_points + $2, updated_at = NOW()
            WHERE id = ANY($1)
            "#,
        )
        .bind(user_ids)
        .bind(delta)
        .execute(&mut *tx)
        .await?;

        Ok(result.rows_affected())
    }
}
