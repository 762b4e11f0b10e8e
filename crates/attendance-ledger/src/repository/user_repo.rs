//! 用户仓储
//!
//! 只读访问：账本从不直接写 users 表，积分变动由 `PointsLedgerRepository` 完成

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::traits::UserDirectory;
use crate::error::Result;
use crate::models::User;

pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 查询操作 ====================

    pub async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, grad_year, current_points, role, status,
                   department, title, registration_date, created_at, updated_at
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    pub async fn find_by_emails(&self, emails: &[String]) -> Result<Vec<User>> {
        if emails.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, grad_year, current_points, role, status,
                   department, title, registration_date, created_at, updated_at
            FROM users
            WHERE email = ANY($1)
            "#,
        )
        .bind(emails)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    // ==================== 事务操作 ====================

    /// 在事务中读取用户，能看到本事务内尚未提交的积分变动
    pub async fn find_by_ids_in_tx(tx: &mut PgConnection, ids: &[i64]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, grad_year, current_points, role, status,
                   department, title, registration_date, created_at, updated_at
            FROM users
            WHERE id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *tx)
        .await?;

        Ok(users)
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<User>> {
        UserRepository::find_by_ids(self, ids).await
    }

    async fn find_by_emails(&self, emails: &[String]) -> Result<Vec<User>> {
        UserRepository::find_by_emails(self, emails).await
    }
}
