//! AttendanceCoordinator 集成测试
//!
//! 协调器的正确性依赖数据库事务、唯一约束与增量更新，无法通过纯 mock 覆盖，
//! 因此使用真实 PostgreSQL。每个测试自行创建用户、活动与奖项，互不干扰。
//!
//! 奖项对所有用户生效，并行测试之间会互相授予奖项，所以奖项断言只针对本测试创建的奖项。
//!
//! ## 运行方式
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo test -p attendance-ledger --test coordinator_test -- --ignored
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use attendance_ledger::{
    Attendance, AttendanceCoordinator, AttendanceQueryService, AttendanceRepository, Award,
    EventRepository, LedgerError, UserAward, UserRepository,
};
use fake::Fake;
use futures::future::join_all;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use passport_shared::config::{LedgerConfig, RemovalDeduction};
use passport_shared::database::Database;
use sqlx::PgPool;

// ==================== 辅助函数 ====================

/// 从环境变量读取数据库 URL，未设置则 panic
fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests")
}

async fn setup_pool() -> PgPool {
    let pool = PgPool::connect(&database_url())
        .await
        .expect("无法连接数据库，请确保 PostgreSQL 正在运行");
    Database::from_pool(pool.clone())
        .run_migrations()
        .await
        .expect("执行迁移失败");
    pool
}

fn coordinator(pool: &PgPool, config: LedgerConfig) -> AttendanceCoordinator<UserRepository> {
    AttendanceCoordinator::new(
        Arc::new(UserRepository::new(pool.clone())),
        pool.clone(),
        config,
    )
}

fn unique_suffix() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!(
        "{}-{}",
        chrono::Utc::now().timestamp_micros(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

/// 测试数据，测试结束时调用 cleanup 删除
#[derive(Default)]
struct Fixture {
    users: Vec<(i64, String)>,
    events: Vec<i64>,
    awards: Vec<i64>,
}

impl Fixture {
    async fn user(&mut self, pool: &PgPool, points: i32) -> (i64, String) {
        let email = format!("{}.{}", unique_suffix(), SafeEmail().fake::<String>());
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (name, email, current_points)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(Name().fake::<String>())
        .bind(&email)
        .bind(points)
        .fetch_one(pool)
        .await
        .expect("插入测试用户失败");

        self.users.push((id, email.clone()));
        (id, email)
    }

    async fn event(&mut self, pool: &PgPool, points_allocation: i32) -> i64 {
        let organizer = self.user(pool, 0).await.0;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO events (name, date_time, organizer_id, points_allocation)
            VALUES ($1, NOW(), $2, $3)
            RETURNING id
            "#,
        )
        .bind(format!("IntegTest Event {}", unique_suffix()))
        .bind(organizer)
        .bind(points_allocation)
        .fetch_one(pool)
        .await
        .expect("插入测试活动失败");

        self.events.push(id);
        id
    }

    async fn award(&mut self, pool: &PgPool, points: i32) -> i64 {
        let award: Award = sqlx::query_as(
            r#"
            INSERT INTO awards (name, points)
            VALUES ($1, $2)
            RETURNING id, name, description, points, icon_url
            "#,
        )
        .bind(format!("IntegTest Award {}", unique_suffix()))
        .bind(points)
        .fetch_one(pool)
        .await
        .expect("插入测试奖项失败");

        assert!(award.is_qualified(points));
        self.awards.push(award.id);
        award.id
    }

    async fn cleanup(&self, pool: &PgPool) {
        let user_ids: Vec<i64> = self.users.iter().map(|(id, _)| *id).collect();

        let _ = sqlx::query("DELETE FROM attendances WHERE event_id = ANY($1) OR user_id = ANY($2)")
            .bind(&self.events)
            .bind(&user_ids)
            .execute(pool)
            .await;
        let _ = sqlx::query("DELETE FROM event_awards WHERE event_id = ANY($1)")
            .bind(&self.events)
            .execute(pool)
            .await;
        let _ = sqlx::query("DELETE FROM events WHERE id = ANY($1)")
            .bind(&self.events)
            .execute(pool)
            .await;
        let _ = sqlx::query("DELETE FROM user_awards WHERE user_id = ANY($1)")
            .bind(&user_ids)
            .execute(pool)
            .await;
        let _ = sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(&user_ids)
            .execute(pool)
            .await;
        // 其他并行测试的用户可能持有这些奖项，删除失败时保留
        let _ = sqlx::query("DELETE FROM awards WHERE id = ANY($1)")
            .bind(&self.awards)
            .execute(pool)
            .await;
    }
}

async fn points_of(pool: &PgPool, user_id: i64) -> i32 {
    sqlx::query_scalar("SELECT current_points FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("查询积分失败")
}

async fn attendance_rows(pool: &PgPool, event_id: i64, user_id: i64) -> i64 {
    let rows: Vec<Attendance> = sqlx::query_as(
        "SELECT id, user_id, event_id, scanned_time FROM attendances WHERE event_id = $1 AND user_id = $2",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
    .expect("查询出勤失败");
    rows.len() as i64
}

async fn has_award(pool: &PgPool, user_id: i64, award_id: i64) -> bool {
    let grant: Option<UserAward> = sqlx::query_as(
        "SELECT user_id, award_id, granted_at FROM user_awards WHERE user_id = $1 AND award_id = $2",
    )
    .bind(user_id)
    .bind(award_id)
    .fetch_optional(pool)
    .await
    .expect("查询授奖失败");
    grant.is_some()
}

fn ids(values: &[i64]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

// ==================== 新增出勤 ====================

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_add_attendance_is_idempotent() {
    let pool = setup_pool().await;
    let mut fx = Fixture::default();
    let (u1, _) = fx.user(&pool, 0).await;
    let (u2, _) = fx.user(&pool, 0).await;
    let event_id = fx.event(&pool, 10).await;
    let svc = coordinator(&pool, LedgerConfig::default());

    let first = svc.add_attendance(event_id, &ids(&[u1, u2])).await.unwrap();
    assert_eq!(first.new_attendees, 2);
    assert_eq!(first.duplicates, 0);
    assert_eq!(first.points_added, 20);
    assert_eq!(first.processed_users.len(), 2);
    assert!(first.processed_users.iter().all(|u| u.current_points == 10));
    assert!(first.processed_users.iter().all(|u| u.awards.is_some()));

    let second = svc.add_attendance(event_id, &ids(&[u1, u2])).await.unwrap();
    assert_eq!(second.new_attendees, 0, "重复登记不应新增出勤");
    assert_eq!(second.duplicates, 2);
    assert_eq!(second.points_added, 0);
    assert_eq!(second.new_awards_granted, 0);
    assert!(second.processed_users.is_empty());

    assert_eq!(points_of(&pool, u1).await, 10, "重复登记不应再次加分");
    assert_eq!(points_of(&pool, u2).await, 10);
    assert_eq!(attendance_rows(&pool, event_id, u1).await, 1);

    fx.cleanup(&pool).await;
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_add_attendance_counts_repeated_tokens_as_duplicates() {
    let pool = setup_pool().await;
    let mut fx = Fixture::default();
    let (u1, _) = fx.user(&pool, 0).await;
    let (u2, _) = fx.user(&pool, 0).await;
    let event_id = fx.event(&pool, 5).await;
    let svc = coordinator(&pool, LedgerConfig::default());

    svc.add_attendance(event_id, &ids(&[u1])).await.unwrap();

    let result = svc
        .add_attendance(event_id, &ids(&[u1, u1, u2]))
        .await
        .unwrap();
    assert_eq!(result.new_attendees, 1);
    assert_eq!(result.duplicates, 2);
    assert_eq!(result.points_added, 5);
    assert_eq!(points_of(&pool, u1).await, 5);
    assert_eq!(points_of(&pool, u2).await, 5);

    fx.cleanup(&pool).await;
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_add_attendance_reports_invalid_identifiers() {
    let pool = setup_pool().await;
    let mut fx = Fixture::default();
    let (u1, _) = fx.user(&pool, 0).await;
    let event_id = fx.event(&pool, 10).await;
    let svc = coordinator(&pool, LedgerConfig::default());

    let missing_id = i64::MAX.to_string();
    let identifiers = vec![u1.to_string(), "notanemail@@".to_string(), missing_id.clone()];

    let result = svc.add_attendance(event_id, &identifiers).await.unwrap();
    assert_eq!(result.new_attendees, 1);
    assert_eq!(result.processed_users[0].id, u1);
    assert_eq!(
        result.invalid_identifiers,
        vec![missing_id, "notanemail@@".to_string()],
        "未匹配的 ID 排在邮箱之前"
    );

    fx.cleanup(&pool).await;
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_add_attendance_resolves_emails() {
    let pool = setup_pool().await;
    let mut fx = Fixture::default();
    let (u1, email) = fx.user(&pool, 0).await;
    let event_id = fx.event(&pool, 3).await;
    let svc = coordinator(&pool, LedgerConfig::default());

    let result = svc
        .add_attendance(event_id, &[email.clone(), u1.to_string()])
        .await
        .unwrap();
    assert_eq!(result.new_attendees, 1, "同一用户的 ID 与邮箱只登记一次");
    assert_eq!(result.duplicates, 1);
    assert_eq!(points_of(&pool, u1).await, 3);

    fx.cleanup(&pool).await;
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_add_attendance_without_valid_users_has_no_effect() {
    let pool = setup_pool().await;
    let mut fx = Fixture::default();
    let event_id = fx.event(&pool, 10).await;
    let svc = coordinator(&pool, LedgerConfig::default());

    let result = svc
        .add_attendance(event_id, &["nobody@nowhere.invalid".to_string()])
        .await
        .unwrap();
    assert_eq!(result.new_attendees, 0);
    assert_eq!(result.points_added, 0);
    assert_eq!(result.invalid_identifiers, vec!["nobody@nowhere.invalid"]);

    fx.cleanup(&pool).await;
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_add_attendance_missing_event() {
    let pool = setup_pool().await;
    let svc = coordinator(&pool, LedgerConfig::default());

    let result = svc
        .add_attendance(i64::MAX, &["nobody@nowhere.invalid".to_string()])
        .await;
    assert!(matches!(result, Err(LedgerError::NotFound { .. })));

    let result = svc.add_attendance(0, &["1".to_string()]).await;
    assert!(matches!(result, Err(LedgerError::InvalidInput(_))));
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_add_attendance_inserts_across_chunks() {
    let pool = setup_pool().await;
    let mut fx = Fixture::default();
    let mut user_ids = Vec::new();
    for _ in 0..25 {
        user_ids.push(fx.user(&pool, 0).await.0);
    }
    let event_id = fx.event(&pool, 2).await;
    let svc = coordinator(
        &pool,
        LedgerConfig {
            insert_chunk_size: 10,
            ..Default::default()
        },
    );

    let result = svc.add_attendance(event_id, &ids(&user_ids)).await.unwrap();
    assert_eq!(result.new_attendees, 25);
    assert_eq!(result.points_added, 50);

    let attendees = AttendanceQueryService::new(
        EventRepository::new(pool.clone()),
        AttendanceRepository::new(pool.clone()),
    )
    .list_attendees(event_id)
    .await
    .unwrap();
    assert_eq!(attendees.len(), 25);

    fx.cleanup(&pool).await;
}

// ==================== 奖项授予 ====================

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_crossing_threshold_grants_award_once() {
    let pool = setup_pool().await;
    let mut fx = Fixture::default();
    let (user, _) = fx.user(&pool, 40).await;
    let award = fx.award(&pool, 50).await;
    let event_id = fx.event(&pool, 10).await;
    let other_event = fx.event(&pool, 10).await;
    let svc = coordinator(&pool, LedgerConfig::default());

    let result = svc.add_attendance(event_id, &ids(&[user])).await.unwrap();
    assert_eq!(points_of(&pool, user).await, 50);
    assert!(result.new_awards_granted >= 1);
    assert!(has_award(&pool, user, award).await, "达到 50 分应获得奖项");
    let earned = result.processed_users[0].awards.as_ref().unwrap();
    assert!(earned.iter().any(|a| a.id == award));

    // 再次加分不会重复授予同一奖项
    svc.add_attendance(other_event, &ids(&[user])).await.unwrap();
    let grants: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM user_awards WHERE user_id = $1 AND award_id = $2")
            .bind(user)
            .bind(award)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(grants, 1);

    fx.cleanup(&pool).await;
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_awards_survive_removal() {
    let pool = setup_pool().await;
    let mut fx = Fixture::default();
    let (user, _) = fx.user(&pool, 40).await;
    let award = fx.award(&pool, 50).await;
    let event_id = fx.event(&pool, 10).await;
    let svc = coordinator(&pool, LedgerConfig::default());

    svc.add_attendance(event_id, &ids(&[user])).await.unwrap();
    assert!(has_award(&pool, user, award).await);

    let removed = svc.remove_attendance(event_id, &ids(&[user])).await.unwrap();
    assert_eq!(removed.removed_count, 1);
    assert_eq!(points_of(&pool, user).await, 40);
    assert!(has_award(&pool, user, award).await, "移除出勤不应撤回奖项");

    fx.cleanup(&pool).await;
}

// ==================== 移除出勤 ====================

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_add_then_remove_restores_balance() {
    let pool = setup_pool().await;
    let mut fx = Fixture::default();
    let (u1, _) = fx.user(&pool, 7).await;
    let (u2, _) = fx.user(&pool, 0).await;
    let event_id = fx.event(&pool, 15).await;
    let svc = coordinator(&pool, LedgerConfig::default());

    svc.add_attendance(event_id, &ids(&[u1, u2])).await.unwrap();
    let result = svc
        .remove_attendance(event_id, &ids(&[u1, u2]))
        .await
        .unwrap();

    assert_eq!(result.removed_count, 2);
    assert_eq!(result.points_deducted, 30);
    assert_eq!(result.processed_users.len(), 2);
    assert!(result.processed_users.iter().all(|u| u.awards.is_none()));
    assert_eq!(points_of(&pool, u1).await, 7);
    assert_eq!(points_of(&pool, u2).await, 0);
    assert_eq!(attendance_rows(&pool, event_id, u1).await, 0);

    fx.cleanup(&pool).await;
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_remove_non_attendee_follows_deduction_policy() {
    let pool = setup_pool().await;
    let mut fx = Fixture::default();
    let (attendee, _) = fx.user(&pool, 0).await;
    let (bystander, _) = fx.user(&pool, 0).await;
    let event_id = fx.event(&pool, 10).await;

    // 默认口径：对所有解析成功的用户扣分，余额可以为负
    let per_user = coordinator(&pool, LedgerConfig::default());
    per_user
        .add_attendance(event_id, &ids(&[attendee]))
        .await
        .unwrap();
    let result = per_user
        .remove_attendance(event_id, &ids(&[attendee, bystander]))
        .await
        .unwrap();
    assert_eq!(result.removed_count, 1);
    // 报告值按实际删除的行数计算，与扣分口径无关
    assert_eq!(result.points_deducted, 10);
    assert_eq!(points_of(&pool, attendee).await, 0);
    assert_eq!(points_of(&pool, bystander).await, -10, "余额不做下限截断");

    // 按删除行口径：只扣实际删除了出勤的用户
    let per_row = coordinator(
        &pool,
        LedgerConfig {
            removal_deduction: RemovalDeduction::PerRemovedRow,
            ..Default::default()
        },
    );
    per_row
        .add_attendance(event_id, &ids(&[attendee]))
        .await
        .unwrap();
    let result = per_row
        .remove_attendance(event_id, &ids(&[attendee, bystander]))
        .await
        .unwrap();
    assert_eq!(result.removed_count, 1);
    assert_eq!(result.points_deducted, 10);
    assert_eq!(points_of(&pool, attendee).await, 0);
    assert_eq!(points_of(&pool, bystander).await, -10);

    fx.cleanup(&pool).await;
}

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_failed_step_rolls_back_whole_transaction() {
    let pool = setup_pool().await;
    let mut fx = Fixture::default();
    let start = i32::MAX - 5;
    let (user, _) = fx.user(&pool, start).await;
    let event_id = fx.event(&pool, 10).await;
    let svc = coordinator(&pool, LedgerConfig::default());

    // 出勤写入成功后加分溢出，整个事务应回滚
    let result = svc.add_attendance(event_id, &ids(&[user])).await;
    assert!(
        matches!(result, Err(LedgerError::StorageFault(_))),
        "加分溢出应返回存储故障: {result:?}"
    );

    assert_eq!(attendance_rows(&pool, event_id, user).await, 0, "出勤记录不应残留");
    assert_eq!(points_of(&pool, user).await, start, "余额不应变化");

    fx.cleanup(&pool).await;
}

// ==================== 删除活动 ====================

#[tokio::test]
#[ignore = "需要 PostgreSQL"]
async fn test_delete_event_cascade() {
    let pool = setup_pool().await;
    let mut fx = Fixture::default();
    let (u1, _) = fx.user(&pool, 45).await;
    let (u2, _) = fx.user(&pool, 0).await;
    let award = fx.award(&pool, 50).await;
    let event_id = fx.event(&pool, 5).await;
    let svc = coordinator(&pool, LedgerConfig::default());

    svc.add_attendance(event_id, &ids(&[u1, u2])).await.unwrap();
    assert!(has_award(&pool, u1, award).await);

    let result = svc.delete_event(event_id).await.unwrap();
    assert_eq!(result.removed_attendances, 2);
    assert_eq!(result.points_deducted, 10);
    assert_eq!(points_of(&pool, u1).await, 45);
    assert_eq!(points_of(&pool, u2).await, 0);
    assert!(has_award(&pool, u1, award).await, "删除活动不应撤回奖项");

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendances WHERE event_id = $1")
        .bind(event_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
    assert!(
        EventRepository::new(pool.clone())
            .get_event(event_id)
            .await
            .unwrap()
            .is_none()
    );

    let again = svc.delete_event(event_id).await;
    assert!(matches!(again, Err(LedgerError::NotFound { .. })));

    fx.cleanup(&pool).await;
}

// ==================== 并发 ====================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "需要 PostgreSQL"]
async fn test_concurrent_adds_do_not_double_count() {
    let pool = setup_pool().await;
    let mut fx = Fixture::default();
    let mut user_ids = Vec::new();
    for _ in 0..5 {
        user_ids.push(fx.user(&pool, 0).await.0);
    }
    let event_id = fx.event(&pool, 10).await;
    let svc = Arc::new(coordinator(&pool, LedgerConfig::default()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let svc = Arc::clone(&svc);
            let identifiers = ids(&user_ids);
            tokio::spawn(async move { svc.add_attendance(event_id, &identifiers).await })
        })
        .collect();

    let mut total_new = 0;
    for handle in handles {
        let result = handle.await.expect("任务 panic");
        match result {
            Ok(response) => total_new += response.new_attendees,
            // 唯一约束冲突整体回滚，属于可重试错误
            Err(e) => assert!(e.is_retryable(), "意外错误: {e}"),
        }
    }

    assert_eq!(total_new, 5, "每个用户只应登记一次");
    for user in &user_ids {
        assert_eq!(points_of(&pool, *user).await, 10, "每个用户只应加一次分");
        assert_eq!(attendance_rows(&pool, event_id, *user).await, 1);
    }

    fx.cleanup(&pool).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "需要 PostgreSQL"]
async fn test_concurrent_events_accumulate_points() {
    let pool = setup_pool().await;
    let mut fx = Fixture::default();
    let (user, _) = fx.user(&pool, 0).await;
    let mut events = Vec::new();
    for _ in 0..5 {
        events.push(fx.event(&pool, 3).await);
    }
    let svc = coordinator(&pool, LedgerConfig::default());
    let identifiers = ids(&[user]);

    let results = join_all(
        events
            .iter()
            .map(|&event_id| svc.add_attendance(event_id, &identifiers)),
    )
    .await;

    for result in results {
        assert_eq!(result.expect("登记失败").new_attendees, 1);
    }

    assert_eq!(points_of(&pool, user).await, 15, "并发加分不应丢失更新");

    fx.cleanup(&pool).await;
}
