//! 应用状态
//!
//! 所有处理器共享的依赖，克隆开销只有几个 Arc

use std::sync::Arc;

use attendance_ledger::{
    AttendanceCoordinator, AttendanceQueryService, AttendanceRepository, EventRepository,
    UserRepository,
};
use passport_shared::config::AppConfig;
use passport_shared::database::Database;

use crate::auth::JwtManager;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub coordinator: Arc<AttendanceCoordinator<UserRepository>>,
    pub query_service: Arc<AttendanceQueryService>,
    pub jwt_manager: Arc<JwtManager>,
}

impl AppState {
    pub fn new(db: Database, config: &AppConfig) -> Self {
        let pool = db.pool().clone();

        let coordinator = AttendanceCoordinator::new(
            Arc::new(UserRepository::new(pool.clone())),
            pool.clone(),
            config.ledger.clone(),
        );
        let query_service = AttendanceQueryService::new(
            EventRepository::new(pool.clone()),
            AttendanceRepository::new(pool),
        );

        Self {
            db,
            coordinator: Arc::new(coordinator),
            query_service: Arc::new(query_service),
            jwt_manager: Arc::new(JwtManager::new(&config.auth)),
        }
    }
}
