//! 仓储 Trait 定义
//!
//! 标识符解析只依赖用户目录接口，便于不连数据库做 mock 测试

use async_trait::async_trait;

use crate::error::Result;
use crate::models::User;

/// 用户目录接口
///
/// 两个方法都是单条集合查询，未匹配的值直接缺席于结果中
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// 按主键批量查询
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<User>>;

    /// 按唯一邮箱批量查询
    async fn find_by_emails(&self, emails: &[String]) -> Result<Vec<User>>;
}
