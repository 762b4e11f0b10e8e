//! 服务层数据传输对象
//!
//! 响应字段采用 snake_case，与既有客户端保持一致

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{EarnedAwardRow, User, UserRole, UserStatus};

/// 用户已获得的奖项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnedAwardDto {
    pub id: i64,
    pub name: String,
    pub points: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    pub granted_at: DateTime<Utc>,
}

impl From<EarnedAwardRow> for EarnedAwardDto {
    fn from(row: EarnedAwardRow) -> Self {
        Self {
            id: row.award_id,
            name: row.name,
            points: row.points,
            icon_url: row.icon_url,
            granted_at: row.granted_at,
        }
    }
}

/// 本次操作涉及的用户（事务内读取，反映提交后的积分）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedUserDto {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub current_points: i32,
    pub role: UserRole,
    pub status: UserStatus,
    /// 仅新增出勤时返回
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awards: Option<Vec<EarnedAwardDto>>,
}

impl ProcessedUserDto {
    pub fn from_user(user: User, awards: Option<Vec<EarnedAwardDto>>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            current_points: user.current_points,
            role: user.role,
            status: user.status,
            awards,
        }
    }
}

/// 新增出勤结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddAttendanceResponse {
    pub message: String,
    pub new_attendees: usize,
    pub duplicates: usize,
    pub points_added: i64,
    pub new_awards_granted: u64,
    pub processed_users: Vec<ProcessedUserDto>,
    pub invalid_identifiers: Vec<String>,
}

impl AddAttendanceResponse {
    /// 没有任何标识符匹配到用户
    pub fn no_valid_users(invalid_identifiers: Vec<String>) -> Self {
        Self {
            message: NO_VALID_USERS.to_string(),
            new_attendees: 0,
            duplicates: 0,
            points_added: 0,
            new_awards_granted: 0,
            processed_users: Vec::new(),
            invalid_identifiers,
        }
    }
}

/// 移除出勤结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveAttendanceResponse {
    pub message: String,
    pub removed_count: usize,
    pub points_deducted: i64,
    pub processed_users: Vec<ProcessedUserDto>,
    pub invalid_identifiers: Vec<String>,
}

impl RemoveAttendanceResponse {
    pub fn no_valid_users(invalid_identifiers: Vec<String>) -> Self {
        Self {
            message: NO_VALID_USERS.to_string(),
            removed_count: 0,
            points_deducted: 0,
            processed_users: Vec::new(),
            invalid_identifiers,
        }
    }
}

/// 删除活动结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteEventResponse {
    pub message: String,
    pub removed_attendances: usize,
    pub points_deducted: i64,
}

pub(crate) const NO_VALID_USERS: &str = "没有匹配到有效用户";
