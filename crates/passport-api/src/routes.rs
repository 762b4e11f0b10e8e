//! 路由配置模块
//!
//! `/events` 下的所有路由都需要认证，写操作另外要求 admin / staff 角色

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use passport_shared::observability::middleware as obs_middleware;

use crate::{
    handlers,
    middleware::{auth_middleware, require_manager},
    state::AppState,
};

/// 活动与出勤路由
fn event_routes(state: AppState) -> Router<AppState> {
    let manage = Router::new()
        .route(
            "/events/{event_id}/attendances",
            post(handlers::attendance::add_attendances)
                .delete(handlers::attendance::remove_attendances),
        )
        .route("/events/{event_id}", delete(handlers::event::delete_event))
        .route_layer(middleware::from_fn(require_manager));

    let read = Router::new().route(
        "/events/{event_id}/attendees",
        get(handlers::attendance::list_attendees),
    );

    manage
        .merge(read)
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// 构建完整应用路由（不含 CORS，由启动入口按配置添加）
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(event_routes(state.clone()))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
