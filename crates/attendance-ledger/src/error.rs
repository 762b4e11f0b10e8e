//! 账本错误类型
//!
//! 无法匹配的标识符属于正常数据，不会产生错误

use thiserror::Error;

/// 账本错误类型
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{entity}不存在: id={id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("参数校验失败: {0}")]
    InvalidInput(String),

    /// 唯一键、外键或检查约束冲突
    #[error("数据冲突: {0}")]
    ConflictOrRace(String),

    /// 连接、查询或提交失败
    #[error("存储故障: {0}")]
    StorageFault(#[source] sqlx::Error),
}

/// 账本 Result 类型别名
pub type Result<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    pub fn event_not_found(id: i64) -> Self {
        Self::NotFound { entity: "活动", id }
    }

    /// 检查是否为可重试的错误
    ///
    /// 并发写入导致的约束冲突在重新执行后通常可以成功
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConflictOrRace(_))
            || matches!(
                self,
                Self::StorageFault(sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))
            )
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::ConflictOrRace(_) => "CONFLICT_OR_RACE",
            Self::StorageFault(_) => "STORAGE_FAULT",
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation()
                || db_err.is_foreign_key_violation()
                || db_err.is_check_violation()
            {
                let detail = match db_err.constraint() {
                    Some(constraint) => format!("{} ({})", db_err.message(), constraint),
                    None => db_err.message().to_string(),
                };
                return Self::ConflictOrRace(detail);
            }
        }
        Self::StorageFault(err)
    }
}
