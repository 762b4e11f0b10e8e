//! 活动 API 处理器

use attendance_ledger::dto::DeleteEventResponse;
use axum::{
    Extension, Json,
    extract::{Path, State, rejection::PathRejection},
};
use tracing::info;

use crate::{auth::Claims, error::ApiError, state::AppState};

/// 删除活动，同时扣回出勤者积分
///
/// DELETE /events/{event_id}
pub async fn delete_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteEventResponse>, ApiError> {
    let Path(event_id) = path?;
    let response = state.coordinator.delete_event(event_id).await?;

    info!(
        operator = claims.user_id,
        event_id,
        removed_attendances = response.removed_attendances,
        "活动已删除"
    );
    Ok(Json(response))
}
