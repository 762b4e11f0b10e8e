//! 出勤事务协调器
//!
//! 出勤、积分、授奖三张表的唯一写入方。每个操作在一个数据库事务内完成，
//! 任何一步失败时事务随 `Transaction` 被 drop 而回滚，不会留下部分结果。
//!
//! ## 新增出勤流程
//!
//! 1. 活动存在性检查 -> 2. 标识符解析 -> 3. 开启事务并共享锁定活动
//!    -> 4. 已出勤用户差集 -> 5. 分批写入出勤 -> 6. 为实际写入的用户加分
//!    -> 7. 授予达到门槛的奖项 -> 8. 读取处理结果 -> 9. 提交
//!
//! 第 5 步以唯一约束兜底：并发请求抢先写入的用户不会被重复加分。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};

use passport_shared::config::{LedgerConfig, RemovalDeduction};
use passport_shared::observability::metrics;

use crate::error::{LedgerError, Result};
use crate::models::NewAttendance;
use crate::repository::{
    AttendanceRepository, AwardRepository, EventRepository, PointsLedgerRepository,
    UserDirectory, UserRepository,
};
use crate::service::dto::{
    AddAttendanceResponse, DeleteEventResponse, EarnedAwardDto, ProcessedUserDto,
    RemoveAttendanceResponse,
};
use crate::service::identifier::IdentifierResolver;

/// 出勤事务协调器
pub struct AttendanceCoordinator<D>
where
    D: UserDirectory,
{
    resolver: IdentifierResolver<D>,
    event_repo: EventRepository,
    pool: PgPool,
    config: LedgerConfig,
}

impl<D> AttendanceCoordinator<D>
where
    D: UserDirectory,
{
    pub fn new(directory: Arc<D>, pool: PgPool, config: LedgerConfig) -> Self {
        Self {
            resolver: IdentifierResolver::new(directory),
            event_repo: EventRepository::new(pool.clone()),
            pool,
            config,
        }
    }

    /// 为活动批量登记出勤
    #[instrument(skip(self, identifiers), fields(identifier_count = identifiers.len()))]
    pub async fn add_attendance(
        &self,
        event_id: i64,
        identifiers: &[String],
    ) -> Result<AddAttendanceResponse> {
        let start = Instant::now();
        let result = self.execute_add(event_id, identifiers).await;
        metrics::record_ledger_transaction("add", outcome(&result), start.elapsed().as_secs_f64());
        result
    }

    /// 批量移除活动出勤并扣减积分
    #[instrument(skip(self, identifiers), fields(identifier_count = identifiers.len()))]
    pub async fn remove_attendance(
        &self,
        event_id: i64,
        identifiers: &[String],
    ) -> Result<RemoveAttendanceResponse> {
        let start = Instant::now();
        let result = self.execute_remove(event_id, identifiers).await;
        metrics::record_ledger_transaction(
            "remove",
            outcome(&result),
            start.elapsed().as_secs_f64(),
        );
        result
    }

    /// 删除活动：扣回所有出勤者的积分、删除出勤记录后删除活动
    ///
    /// 已授予的奖项不撤回
    #[instrument(skip(self))]
    pub async fn delete_event(&self, event_id: i64) -> Result<DeleteEventResponse> {
        let start = Instant::now();
        let result = self.execute_delete_event(event_id).await;
        metrics::record_ledger_transaction(
            "delete_event",
            outcome(&result),
            start.elapsed().as_secs_f64(),
        );
        result
    }

    // ==================== 事务执行 ====================

    async fn execute_add(
        &self,
        event_id: i64,
        identifiers: &[String],
    ) -> Result<AddAttendanceResponse> {
        ensure_event_id(event_id)?;
        self.ensure_event_exists(event_id).await?;

        let resolution = self.resolver.resolve(identifiers).await?;
        if resolution.is_empty() {
            info!(
                invalid = resolution.invalid_identifiers.len(),
                "没有匹配到有效用户，跳过出勤登记"
            );
            return Ok(AddAttendanceResponse::no_valid_users(
                resolution.invalid_identifiers,
            ));
        }

        let candidate_ids = resolution.user_ids();

        let mut tx = self.pool.begin().await?;

        let event = EventRepository::get_for_share_in_tx(&mut tx, event_id)
            .await?
            .ok_or_else(|| LedgerError::event_not_found(event_id))?;

        let existing =
            AttendanceRepository::existing_attendees_in_tx(&mut tx, event_id, &candidate_ids)
                .await?;
        let add_set = plan_additions(&candidate_ids, &existing);

        let rows = NewAttendance::batch(event_id, &add_set, Utc::now());
        let mut inserted =
            AttendanceRepository::insert_batch_in_tx(&mut tx, &rows, self.config.insert_chunk_size)
                .await?;
        inserted.sort_unstable();

        if inserted.len() < add_set.len() {
            warn!(
                planned = add_set.len(),
                inserted = inserted.len(),
                "部分出勤已被并发请求写入，跳过重复加分"
            );
        }

        PointsLedgerRepository::adjust_in_tx(&mut tx, &inserted, event.points_allocation).await?;
        let granted = AwardRepository::grant_qualifying_in_tx(&mut tx, &inserted).await?;

        let processed_users = load_processed_users(&mut tx, &inserted, true).await?;

        tx.commit().await?;

        let new_attendees = inserted.len();
        let points_added = points_for(event.points_allocation, new_attendees);

        metrics::record_attendance_added(new_attendees as u64);
        metrics::record_points_delta(points_added);
        metrics::record_award_grants(granted);

        info!(
            new_attendees,
            points_added,
            new_awards_granted = granted,
            invalid = resolution.invalid_identifiers.len(),
            "出勤登记完成"
        );

        Ok(AddAttendanceResponse {
            message: "出勤已登记".to_string(),
            new_attendees,
            duplicates: duplicate_count(resolution.matched_tokens, new_attendees),
            points_added,
            new_awards_granted: granted,
            processed_users,
            invalid_identifiers: resolution.invalid_identifiers,
        })
    }

    async fn execute_remove(
        &self,
        event_id: i64,
        identifiers: &[String],
    ) -> Result<RemoveAttendanceResponse> {
        ensure_event_id(event_id)?;
        self.ensure_event_exists(event_id).await?;

        let resolution = self.resolver.resolve(identifiers).await?;
        if resolution.is_empty() {
            info!(
                invalid = resolution.invalid_identifiers.len(),
                "没有匹配到有效用户，跳过出勤移除"
            );
            return Ok(RemoveAttendanceResponse::no_valid_users(
                resolution.invalid_identifiers,
            ));
        }

        let candidate_ids = resolution.user_ids();

        let mut tx = self.pool.begin().await?;

        let event = EventRepository::get_for_share_in_tx(&mut tx, event_id)
            .await?
            .ok_or_else(|| LedgerError::event_not_found(event_id))?;

        let removed =
            AttendanceRepository::delete_by_event_and_users_in_tx(&mut tx, event_id, &candidate_ids)
                .await?;

        let targets = deduction_targets(self.config.removal_deduction, &candidate_ids, &removed);
        PointsLedgerRepository::adjust_in_tx(
            &mut tx,
            targets,
            negate_allocation(event.points_allocation)?,
        )
        .await?;

        let processed_users = load_processed_users(&mut tx, &candidate_ids, false).await?;

        tx.commit().await?;

        // 响应按实际删除的行数报告，与扣分口径无关
        let points_deducted = points_for(event.points_allocation, removed.len());

        metrics::record_attendance_removed("remove", removed.len() as u64);
        metrics::record_points_delta(-points_for(event.points_allocation, targets.len()));

        info!(
            removed_count = removed.len(),
            points_deducted,
            policy = ?self.config.removal_deduction,
            invalid = resolution.invalid_identifiers.len(),
            "出勤移除完成"
        );

        Ok(RemoveAttendanceResponse {
            message: "出勤已移除".to_string(),
            removed_count: removed.len(),
            points_deducted,
            processed_users,
            invalid_identifiers: resolution.invalid_identifiers,
        })
    }

    async fn execute_delete_event(&self, event_id: i64) -> Result<DeleteEventResponse> {
        ensure_event_id(event_id)?;

        let mut tx = self.pool.begin().await?;

        let event = EventRepository::get_for_update_in_tx(&mut tx, event_id)
            .await?
            .ok_or_else(|| LedgerError::event_not_found(event_id))?;

        let attendees = AttendanceRepository::delete_by_event_in_tx(&mut tx, event_id).await?;
        PointsLedgerRepository::adjust_in_tx(
            &mut tx,
            &attendees,
            negate_allocation(event.points_allocation)?,
        )
        .await?;

        EventRepository::delete_in_tx(&mut tx, event_id).await?;

        tx.commit().await?;

        let points_deducted = points_for(event.points_allocation, attendees.len());

        metrics::record_attendance_removed("delete_event", attendees.len() as u64);
        metrics::record_points_delta(-points_deducted);

        info!(
            removed_attendances = attendees.len(),
            points_deducted,
            "活动已删除"
        );

        Ok(DeleteEventResponse {
            message: "活动已删除".to_string(),
            removed_attendances: attendees.len(),
            points_deducted,
        })
    }

    async fn ensure_event_exists(&self, event_id: i64) -> Result<()> {
        self.event_repo
            .get_event(event_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| LedgerError::event_not_found(event_id))
    }
}

/// 在事务内读取本次处理的用户，可选附带已获得的奖项
async fn load_processed_users(
    tx: &mut PgConnection,
    user_ids: &[i64],
    with_awards: bool,
) -> Result<Vec<ProcessedUserDto>> {
    let users = UserRepository::find_by_ids_in_tx(&mut *tx, user_ids).await?;

    if !with_awards {
        return Ok(users
            .into_iter()
            .map(|u| ProcessedUserDto::from_user(u, None))
            .collect());
    }

    let earned = AwardRepository::list_earned_in_tx(&mut *tx, user_ids).await?;
    let processed = users
        .into_iter()
        .map(|user| {
            let awards = earned
                .iter()
                .filter(|row| row.user_id == user.id)
                .cloned()
                .map(EarnedAwardDto::from)
                .collect();
            ProcessedUserDto::from_user(user, Some(awards))
        })
        .collect();

    Ok(processed)
}

fn ensure_event_id(event_id: i64) -> Result<()> {
    if event_id <= 0 {
        return Err(LedgerError::InvalidInput(format!(
            "活动 ID 必须为正整数: {}",
            event_id
        )));
    }
    Ok(())
}

fn outcome<T>(result: &Result<T>) -> &'static str {
    if result.is_ok() { "success" } else { "failure" }
}

/// 候选用户减去已出勤用户，保持候选顺序
fn plan_additions(candidates: &[i64], existing: &HashSet<i64>) -> Vec<i64> {
    candidates
        .iter()
        .copied()
        .filter(|id| !existing.contains(id))
        .collect()
}

/// 匹配成功的标识符中未产生新出勤的部分（含同一用户的重复标识符）
fn duplicate_count(matched_tokens: usize, new_attendees: usize) -> usize {
    matched_tokens.saturating_sub(new_attendees)
}

/// 按扣分口径选择需要扣分的用户
fn deduction_targets<'a>(
    policy: RemovalDeduction,
    resolved: &'a [i64],
    removed: &'a [i64],
) -> &'a [i64] {
    match policy {
        RemovalDeduction::PerResolvedUser => resolved,
        RemovalDeduction::PerRemovedRow => removed,
    }
}

fn points_for(points_allocation: i32, users: usize) -> i64 {
    i64::from(points_allocation) * users as i64
}

fn negate_allocation(points_allocation: i32) -> Result<i32> {
    points_allocation.checked_neg().ok_or_else(|| {
        LedgerError::InvalidInput(format!("活动积分超出范围: {}", points_allocation))
    })
}
