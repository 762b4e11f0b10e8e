//! 请求 DTO 定义

use serde::Deserialize;
use validator::Validate;

/// 单次请求允许提交的标识符上限
pub const MAX_IDENTIFIERS: u64 = 5000;

/// 新增或移除出勤的请求体
///
/// 标识符可以是用户 ID 或邮箱，空列表合法，按无有效用户处理
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IdentifiersRequest {
    #[validate(length(max = MAX_IDENTIFIERS, message = "单次最多提交 5000 个标识符"))]
    pub identifiers: Vec<String>,
}
