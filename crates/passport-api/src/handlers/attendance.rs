//! 出勤 API 处理器

use attendance_ledger::dto::{AddAttendanceResponse, RemoveAttendanceResponse};
use attendance_ledger::AttendeeSummary;
use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use tracing::info;
use validator::Validate;

use crate::{auth::Claims, dto::IdentifiersRequest, error::ApiError, state::AppState};

/// 批量登记出勤
///
/// POST /events/{event_id}/attendances
pub async fn add_attendances(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<IdentifiersRequest>, JsonRejection>,
) -> Result<Json<AddAttendanceResponse>, ApiError> {
    let Path(event_id) = path?;
    let Json(req) = body?;
    req.validate()?;

    let response = state
        .coordinator
        .add_attendance(event_id, &req.identifiers)
        .await?;

    info!(
        operator = claims.user_id,
        event_id,
        new_attendees = response.new_attendees,
        "出勤已登记"
    );
    Ok(Json(response))
}

/// 批量移除出勤
///
/// DELETE /events/{event_id}/attendances
pub async fn remove_attendances(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<IdentifiersRequest>, JsonRejection>,
) -> Result<Json<RemoveAttendanceResponse>, ApiError> {
    let Path(event_id) = path?;
    let Json(req) = body?;
    req.validate()?;

    let response = state
        .coordinator
        .remove_attendance(event_id, &req.identifiers)
        .await?;

    info!(
        operator = claims.user_id,
        event_id,
        removed_count = response.removed_count,
        "出勤已移除"
    );
    Ok(Json(response))
}

/// 活动出勤名单
///
/// GET /events/{event_id}/attendees
pub async fn list_attendees(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<AttendeeSummary>>, ApiError> {
    let Path(event_id) = path?;
    let attendees = state.query_service.list_attendees(event_id).await?;
    Ok(Json(attendees))
}
