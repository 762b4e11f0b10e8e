//! 奖项授予仓储
//!
//! 授予是单条集合语句：{(u, a) | a.points <= u.current_points} 减去已有授奖。
//! "已授予" 的排除在事务内由数据库判定，并发授予由主键冲突吸收。

use sqlx::PgConnection;

use crate::error::Result;
use crate::models::EarnedAwardRow;

pub struct AwardRepository;

impl AwardRepository {
    /// 为给定用户授予所有已达门槛但尚未获得的奖项，返回新授予数量
    ///
    /// 必须在同一事务的积分调整之后调用
    pub async fn grant_qualifying_in_tx(tx: &mut PgConnection, user_ids: &[i64]) -> Result<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO user_awards (user_id, award_id, granted_at)
            SELECT u.id, a.id, NOW()
            FROM users u
            CROSS JOIN awards a
            WHERE u.id = ANY($1)
              AND a.points <= u.current_points
              AND NOT EXISTS (
                  SELECT 1 FROM user_awards ua
                  WHERE ua.user_id = u.id AND ua.award_id = a.id
              )
            ON CONFLICT (user_id, award_id) DO NOTHING
            "#,
        )
        .bind(user_ids)
        .execute(&mut *tx)
        .await?;

        Ok(result.rows_affected())
    }

    /// 查询用户已获得的奖项
    pub async fn list_earned_in_tx(
        tx: &mut PgConnection,
        user_ids: &[i64],
    ) -> Result<Vec<EarnedAwardRow>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, EarnedAwardRow>(
            r#"
            SELECT ua.user_id, a.id AS award_id, a.name, a.points, a.icon_url, ua.granted_at
            FROM user_awards ua
            JOIN awards a ON a.id = ua.award_id
            WHERE ua.user_id = ANY($1)
            ORDER BY ua.user_id, a.points, a.id
            "#,
        )
        .bind(user_ids)
        .fetch_all(&mut *tx)
        .await?;

        Ok(rows)
    }
}
