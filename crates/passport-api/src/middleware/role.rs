//! 角色检查中间件
//!
//! 出勤与活动的写操作只对 admin / staff 开放

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::Claims;
use crate::error::ApiError;

/// 要求当前用户可以维护出勤，必须位于 `auth_middleware` 之后
pub async fn require_manager(request: Request<Body>, next: Next) -> Response {
    let Some(claims) = request.extensions().get::<Claims>() else {
        return ApiError::Unauthorized("未认证".to_string()).into_response();
    };

    if !claims.role.can_manage_attendance() {
        return ApiError::Forbidden(format!("角色 {} 无权维护出勤", claims.role)).into_response();
    }

    next.run(request).await
}
