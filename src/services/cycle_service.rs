use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use uuid::Uuid;

use crate::{
    audit,
    availability::{self, Availability, DateRange},
    dto::cycles::{
        CreateCycleRequest, CycleDetails, CycleList, CycleSummary, SessionRequest, SessionView,
        SetEnrollmentOpenRequest, UpdateCycleRequest,
    },
    entity::{
        enrollments::{Column as EnrollmentCol, Entity as Enrollments},
        payments::Entity as Payments,
        workshop_cycles::{
            ActiveModel as CycleActive, Column as CycleCol, Entity as WorkshopCycles,
            Model as CycleModel, Relation as CycleRelation,
        },
        workshop_sessions::{
            ActiveModel as SessionActive, Column as SessionCol, Entity as WorkshopSessions,
            Model as SessionModel,
        },
        workshops::{Column as WorkshopCol, Entity as Workshops, Model as WorkshopModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_any_role},
    models::{EnrollmentStatus, Role, WorkshopCycle, WorkshopSession},
    response::{ApiResponse, Meta},
    routes::params::CycleQuery,
    services::user_service::ensure_instructor,
    state::AppState,
};

pub async fn list_cycles(state: &AppState, query: CycleQuery) -> AppResult<ApiResponse<CycleList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    if let Some(workshop_id) = query.workshop_id {
        condition = condition.add(CycleCol::WorkshopId.eq(workshop_id));
    }
    if query.open_only.unwrap_or(false) {
        condition = condition.add(CycleCol::IsOpenForEnrollment.eq(true));
    }

    let finder = WorkshopCycles::find()
        .filter(condition)
        .order_by_asc(CycleCol::StartDate);
    let total = finder.clone().count(&state.orm).await? as i64;
    let cycles = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = summarize_cycles(&state.orm, cycles, Utc::now()).await?;
    Ok(ApiResponse::success(
        "Cycles",
        CycleList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Cycles the calling instructor is responsible for.
pub async fn my_cycles(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CycleList>> {
    ensure_any_role(user, &[Role::Instructor])?;
    let cycles = WorkshopCycles::find()
        .join(JoinType::InnerJoin, CycleRelation::Workshops.def())
        .filter(
            Condition::any()
                .add(CycleCol::InstructorOverrideId.eq(user.user_id))
                .add(
                    Condition::all()
                        .add(CycleCol::InstructorOverrideId.is_null())
                        .add(WorkshopCol::DefaultInstructorId.eq(user.user_id)),
                ),
        )
        .order_by_asc(CycleCol::StartDate)
        .all(&state.orm)
        .await?;

    let items = summarize_cycles(&state.orm, cycles, Utc::now()).await?;
    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Cycles",
        CycleList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn get_cycle(state: &AppState, id: Uuid) -> AppResult<ApiResponse<CycleDetails>> {
    let (cycle, workshop) = find_cycle_with_workshop(&state.orm, id).await?;
    let sessions = sessions_for(&state.orm, &[cycle.id]).await?;
    let active = active_count(&state.orm, cycle.id).await?;
    let now = Utc::now();

    let summary = build_summary(cycle, workshop.max_participants, &sessions, active, now);
    let sessions = sessions
        .into_iter()
        .map(|s| {
            let time_state = availability::time_state(
                now,
                s.start_time.with_timezone(&Utc),
                s.end_time.with_timezone(&Utc),
            );
            SessionView {
                session: session_from_entity(s),
                time_state,
            }
        })
        .collect();

    Ok(ApiResponse::success(
        "Cycle",
        CycleDetails {
            workshop_title: workshop.title,
            summary,
            sessions,
        },
        None,
    ))
}

pub async fn create_cycle(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCycleRequest,
) -> AppResult<ApiResponse<WorkshopCycle>> {
    let workshop = Workshops::find_by_id(payload.workshop_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Workshop not found".into()))?;
    ensure_responsible(user, workshop.default_instructor_id)?;

    let display_name = payload.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(AppError::BadRequest("display_name is required".into()));
    }
    validate_dates(payload.start_date, payload.end_date)?;
    validate_capacity(payload.max_participants_override)?;
    if let Some(instructor_id) = payload.instructor_override_id {
        ensure_instructor(&state.orm, instructor_id).await?;
    }

    let cycle = CycleActive {
        id: Set(Uuid::new_v4()),
        workshop_id: Set(workshop.id),
        display_name: Set(display_name),
        start_date: Set(payload.start_date.into()),
        end_date: Set(payload.end_date.map(Into::into)),
        is_open_for_enrollment: Set(payload.is_open_for_enrollment.unwrap_or(true)),
        max_participants_override: Set(payload.max_participants_override),
        address_id: Set(payload.address_id),
        instructor_override_id: Set(payload.instructor_override_id),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "cycle_create",
        "workshop_cycles",
        serde_json::json!({ "cycle_id": cycle.id, "workshop_id": workshop.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Cycle created",
        cycle_from_entity(cycle),
        Some(Meta::empty()),
    ))
}

pub async fn update_cycle(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCycleRequest,
) -> AppResult<ApiResponse<WorkshopCycle>> {
    let txn = state.orm.begin().await?;
    let (cycle, workshop) = lock_cycle_with_workshop(&txn, id).await?;
    ensure_can_manage(user, &cycle, &workshop)?;

    let start = payload
        .start_date
        .unwrap_or_else(|| cycle.start_date.with_timezone(&Utc));
    let end = match payload.end_date {
        Some(end) => end,
        None => cycle.end_date.map(|d| d.with_timezone(&Utc)),
    };
    validate_dates(start, end)?;

    if let Some(override_cap) = payload.max_participants_override {
        validate_capacity(override_cap)?;
        // The row lock keeps `enroll` from slipping in between count and update.
        let capacity = availability::effective_capacity(override_cap, workshop.max_participants);
        ensure_fits(capacity, active_count(&txn, cycle.id).await?)?;
    }
    if let Some(Some(instructor_id)) = payload.instructor_override_id {
        ensure_instructor(&txn, instructor_id).await?;
    }

    let mut active: CycleActive = cycle.into();
    if let Some(name) = payload.display_name.map(|n| n.trim().to_string()) {
        if name.is_empty() {
            return Err(AppError::BadRequest("display_name is required".into()));
        }
        active.display_name = Set(name);
    }
    active.start_date = Set(start.into());
    active.end_date = Set(end.map(Into::into));
    if let Some(capacity) = payload.max_participants_override {
        active.max_participants_override = Set(capacity);
    }
    if let Some(address_id) = payload.address_id {
        active.address_id = Set(address_id);
    }
    if let Some(instructor_id) = payload.instructor_override_id {
        active.instructor_override_id = Set(instructor_id);
    }
    let cycle = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "cycle_update",
        "workshop_cycles",
        serde_json::json!({ "cycle_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        cycle_from_entity(cycle),
        Some(Meta::empty()),
    ))
}

pub async fn set_enrollment_open(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: SetEnrollmentOpenRequest,
) -> AppResult<ApiResponse<WorkshopCycle>> {
    let (cycle, workshop) = find_cycle_with_workshop(&state.orm, id).await?;
    ensure_can_manage(user, &cycle, &workshop)?;

    let mut active: CycleActive = cycle.into();
    active.is_open_for_enrollment = Set(payload.open);
    let cycle = active.update(&state.orm).await?;

    tracing::info!(cycle_id = %id, open = payload.open, "enrollment toggled");
    audit::record(
        &state.pool,
        user.user_id,
        if payload.open { "cycle_open" } else { "cycle_close" },
        "workshop_cycles",
        serde_json::json!({ "cycle_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        cycle_from_entity(cycle),
        Some(Meta::empty()),
    ))
}

pub async fn delete_cycle(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let txn = state.orm.begin().await?;
    let (cycle, workshop) = lock_cycle_with_workshop(&txn, id).await?;
    ensure_can_manage(user, &cycle, &workshop)?;

    if active_count(&txn, id).await? > 0 {
        return Err(AppError::BadRequest(
            "Cycle has active enrollments; cancel them first".into(),
        ));
    }
    // Deleting would cascade into payment history and revenue.
    let payments = Payments::find()
        .inner_join(Enrollments)
        .filter(EnrollmentCol::CycleId.eq(id))
        .count(&txn)
        .await?;
    if payments > 0 {
        return Err(AppError::BadRequest(
            "Cycle has recorded payments and cannot be deleted".into(),
        ));
    }

    WorkshopCycles::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "cycle_delete",
        "workshop_cycles",
        serde_json::json!({ "cycle_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn add_session(
    state: &AppState,
    user: &AuthUser,
    cycle_id: Uuid,
    payload: SessionRequest,
) -> AppResult<ApiResponse<WorkshopSession>> {
    let txn = state.orm.begin().await?;
    let (cycle, workshop) = lock_cycle_with_workshop(&txn, cycle_id).await?;
    ensure_can_manage(user, &cycle, &workshop)?;
    let topic = validate_session(&payload)?;

    if !workshop.is_series {
        let existing = WorkshopSessions::find()
            .filter(SessionCol::CycleId.eq(cycle_id))
            .count(&txn)
            .await?;
        if existing > 0 {
            return Err(AppError::BadRequest(
                "A single-event workshop holds one session per cycle".into(),
            ));
        }
    }

    let session = SessionActive {
        id: Set(Uuid::new_v4()),
        cycle_id: Set(cycle_id),
        topic: Set(topic),
        start_time: Set(payload.start_time.into()),
        end_time: Set(payload.end_time.into()),
        address_id: Set(payload.address_id),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "session_create",
        "workshop_sessions",
        serde_json::json!({ "cycle_id": cycle_id, "session_id": session.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Session created",
        session_from_entity(session),
        Some(Meta::empty()),
    ))
}

pub async fn update_session(
    state: &AppState,
    user: &AuthUser,
    cycle_id: Uuid,
    session_id: Uuid,
    payload: SessionRequest,
) -> AppResult<ApiResponse<WorkshopSession>> {
    let (cycle, workshop) = find_cycle_with_workshop(&state.orm, cycle_id).await?;
    ensure_can_manage(user, &cycle, &workshop)?;
    let topic = validate_session(&payload)?;

    let session = find_session(state, cycle_id, session_id).await?;
    let mut active: SessionActive = session.into();
    active.topic = Set(topic);
    active.start_time = Set(payload.start_time.into());
    active.end_time = Set(payload.end_time.into());
    active.address_id = Set(payload.address_id);
    let session = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "session_update",
        "workshop_sessions",
        serde_json::json!({ "cycle_id": cycle_id, "session_id": session_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        session_from_entity(session),
        Some(Meta::empty()),
    ))
}

pub async fn delete_session(
    state: &AppState,
    user: &AuthUser,
    cycle_id: Uuid,
    session_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let (cycle, workshop) = find_cycle_with_workshop(&state.orm, cycle_id).await?;
    ensure_can_manage(user, &cycle, &workshop)?;
    let session = find_session(state, cycle_id, session_id).await?;

    WorkshopSessions::delete_by_id(session.id)
        .exec(&state.orm)
        .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "session_delete",
        "workshop_sessions",
        serde_json::json!({ "cycle_id": cycle_id, "session_id": session_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Admins manage everything; instructors manage the cycles they teach.
pub(crate) fn ensure_can_manage(
    user: &AuthUser,
    cycle: &CycleModel,
    workshop: &WorkshopModel,
) -> AppResult<()> {
    ensure_responsible(user, responsible_instructor(cycle, workshop))
}

/// Passes admins, and instructors named as `responsible`.
pub(crate) fn ensure_responsible(user: &AuthUser, responsible: Option<Uuid>) -> AppResult<()> {
    if user.is_admin() {
        return Ok(());
    }
    if user.has_role(Role::Instructor) && responsible == Some(user.user_id) {
        return Ok(());
    }
    Err(AppError::Forbidden)
}

/// Rejects a capacity below the number of seats already taken.
pub(crate) fn ensure_fits(capacity: Option<i32>, active: i64) -> AppResult<()> {
    match capacity {
        Some(capacity) if i64::from(capacity) < active => Err(AppError::BadRequest(format!(
            "Cycle already has {active} active enrollments"
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn responsible_instructor(cycle: &CycleModel, workshop: &WorkshopModel) -> Option<Uuid> {
    cycle.instructor_override_id.or(workshop.default_instructor_id)
}

pub(crate) async fn find_cycle_with_workshop<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> AppResult<(CycleModel, WorkshopModel)> {
    let (cycle, workshop) = WorkshopCycles::find_by_id(id)
        .find_also_related(Workshops)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    let workshop = workshop.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("cycle {id} has no workshop"))
    })?;
    Ok((cycle, workshop))
}

/// Loads a cycle `FOR UPDATE` so enrollments on it wait for the caller's commit.
pub(crate) async fn lock_cycle_with_workshop<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> AppResult<(CycleModel, WorkshopModel)> {
    let cycle = WorkshopCycles::find_by_id(id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    let workshop = Workshops::find_by_id(cycle.workshop_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cycle {id} has no workshop")))?;
    Ok((cycle, workshop))
}

pub(crate) async fn active_count<C: ConnectionTrait>(conn: &C, cycle_id: Uuid) -> AppResult<i64> {
    let count = Enrollments::find()
        .filter(EnrollmentCol::CycleId.eq(cycle_id))
        .filter(EnrollmentCol::Status.eq(EnrollmentStatus::Active.as_str()))
        .count(conn)
        .await?;
    Ok(count as i64)
}

pub(crate) async fn active_counts<C: ConnectionTrait>(
    conn: &C,
    cycle_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, i64>> {
    #[derive(Debug, FromQueryResult)]
    struct CountRow {
        cycle_id: Uuid,
        active: i64,
    }

    if cycle_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = Enrollments::find()
        .select_only()
        .column(EnrollmentCol::CycleId)
        .column_as(Expr::col(EnrollmentCol::Id).count(), "active")
        .filter(EnrollmentCol::CycleId.is_in(cycle_ids.to_vec()))
        .filter(EnrollmentCol::Status.eq(EnrollmentStatus::Active.as_str()))
        .group_by(EnrollmentCol::CycleId)
        .into_model::<CountRow>()
        .all(conn)
        .await?;

    Ok(rows.into_iter().map(|r| (r.cycle_id, r.active)).collect())
}

pub(crate) async fn sessions_for<C: ConnectionTrait>(
    conn: &C,
    cycle_ids: &[Uuid],
) -> AppResult<Vec<SessionModel>> {
    if cycle_ids.is_empty() {
        return Ok(Vec::new());
    }
    let sessions = WorkshopSessions::find()
        .filter(SessionCol::CycleId.is_in(cycle_ids.to_vec()))
        .order_by_asc(SessionCol::StartTime)
        .all(conn)
        .await?;
    Ok(sessions)
}

/// Loads sessions, capacities and enrollment counts for many cycles at once.
pub(crate) async fn summarize_cycles<C: ConnectionTrait>(
    conn: &C,
    cycles: Vec<CycleModel>,
    now: DateTime<Utc>,
) -> AppResult<Vec<CycleSummary>> {
    let cycle_ids: Vec<Uuid> = cycles.iter().map(|c| c.id).collect();
    let mut workshop_ids: Vec<Uuid> = cycles.iter().map(|c| c.workshop_id).collect();
    workshop_ids.sort();
    workshop_ids.dedup();

    let capacities: HashMap<Uuid, Option<i32>> = if workshop_ids.is_empty() {
        HashMap::new()
    } else {
        Workshops::find()
            .filter(WorkshopCol::Id.is_in(workshop_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|w| (w.id, w.max_participants))
            .collect()
    };
    let counts = active_counts(conn, &cycle_ids).await?;

    let mut sessions_by_cycle: HashMap<Uuid, Vec<SessionModel>> = HashMap::new();
    for session in sessions_for(conn, &cycle_ids).await? {
        sessions_by_cycle
            .entry(session.cycle_id)
            .or_default()
            .push(session);
    }

    Ok(cycles
        .into_iter()
        .map(|cycle| {
            let capacity = capacities.get(&cycle.workshop_id).copied().flatten();
            let active = counts.get(&cycle.id).copied().unwrap_or(0);
            let sessions = sessions_by_cycle.remove(&cycle.id).unwrap_or_default();
            build_summary(cycle, capacity, &sessions, active, now)
        })
        .collect())
}

pub(crate) fn cycle_range(cycle: &CycleModel, sessions: &[SessionModel]) -> DateRange {
    availability::normalize_range(
        cycle.start_date.with_timezone(&Utc),
        cycle.end_date.map(|d| d.with_timezone(&Utc)),
        sessions.iter().map(|s| {
            (
                s.start_time.with_timezone(&Utc),
                s.end_time.with_timezone(&Utc),
            )
        }),
    )
}

pub(crate) fn build_summary(
    cycle: CycleModel,
    workshop_capacity: Option<i32>,
    sessions: &[SessionModel],
    active: i64,
    now: DateTime<Utc>,
) -> CycleSummary {
    let range = cycle_range(&cycle, sessions);
    let capacity =
        availability::effective_capacity(cycle.max_participants_override, workshop_capacity);

    CycleSummary {
        cycle: cycle_from_entity(cycle),
        range_label: range.label(),
        time_state: range.state_at(now),
        countdown: availability::countdown(now, range.start),
        availability: Availability::compute(capacity, active),
        range,
    }
}

async fn find_session(state: &AppState, cycle_id: Uuid, session_id: Uuid) -> AppResult<SessionModel> {
    WorkshopSessions::find_by_id(session_id)
        .filter(SessionCol::CycleId.eq(cycle_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

fn validate_dates(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> AppResult<()> {
    if let Some(end) = end {
        if end < start {
            return Err(AppError::BadRequest("end_date must not precede start_date".into()));
        }
    }
    Ok(())
}

fn validate_capacity(capacity: Option<i32>) -> AppResult<()> {
    if capacity.is_some_and(|c| c < 1) {
        return Err(AppError::BadRequest("max_participants must be at least 1".into()));
    }
    Ok(())
}

fn validate_session(payload: &SessionRequest) -> AppResult<String> {
    let topic = payload.topic.trim();
    if topic.is_empty() {
        return Err(AppError::BadRequest("topic is required".into()));
    }
    if payload.end_time <= payload.start_time {
        return Err(AppError::BadRequest("end_time must be after start_time".into()));
    }
    Ok(topic.to_string())
}

pub(crate) fn cycle_from_entity(model: CycleModel) -> WorkshopCycle {
    WorkshopCycle {
        id: model.id,
        workshop_id: model.workshop_id,
        display_name: model.display_name,
        start_date: model.start_date.with_timezone(&Utc),
        end_date: model.end_date.map(|d| d.with_timezone(&Utc)),
        is_open_for_enrollment: model.is_open_for_enrollment,
        max_participants_override: model.max_participants_override,
        address_id: model.address_id,
        instructor_override_id: model.instructor_override_id,
    }
}

pub(crate) fn session_from_entity(model: SessionModel) -> WorkshopSession {
    WorkshopSession {
        id: model.id,
        cycle_id: model.cycle_id,
        topic: model.topic,
        start_time: model.start_time.with_timezone(&Utc),
        end_time: model.end_time.with_timezone(&Utc),
        address_id: model.address_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::{TimeState, TrafficLight};
    use chrono::{Duration, TimeZone};

    fn cycle(override_cap: Option<i32>, start: DateTime<Utc>) -> CycleModel {
        CycleModel {
            id: Uuid::new_v4(),
            workshop_id: Uuid::new_v4(),
            display_name: "Spring".into(),
            start_date: start.into(),
            end_date: None,
            is_open_for_enrollment: true,
            max_participants_override: override_cap,
            address_id: None,
            instructor_override_id: None,
            created_at: start.into(),
        }
    }

    fn session(cycle_id: Uuid, start: DateTime<Utc>, hours: i64) -> SessionModel {
        SessionModel {
            id: Uuid::new_v4(),
            cycle_id,
            topic: "Intro".into(),
            start_time: start.into(),
            end_time: (start + Duration::hours(hours)).into(),
            address_id: None,
            created_at: start.into(),
        }
    }

    #[test]
    fn summary_uses_sessions_and_override() {
        let day = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap();
        let c = cycle(Some(3), day);
        let sessions = vec![
            session(c.id, day + Duration::days(1), 2),
            session(c.id, day + Duration::days(8), 2),
        ];

        let summary = build_summary(c, Some(20), &sessions, 3, day);
        assert_eq!(summary.availability.display, "0/3");
        assert_eq!(summary.availability.light, TrafficLight::Red);
        assert_eq!(summary.time_state, TimeState::Upcoming);
        assert_eq!(summary.range_label, "2026-05-05 – 2026-05-12");
        assert_eq!(summary.countdown.map(|c| c.days), Some(1));
    }

    #[test]
    fn summary_without_any_capacity_is_unlimited() {
        let day = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap();
        let summary = build_summary(cycle(None, day), None, &[], 40, day + Duration::days(1));
        assert_eq!(summary.availability.display, "Unlimited");
        assert_eq!(summary.time_state, TimeState::Past);
        assert!(summary.countdown.is_none());
    }

    #[test]
    fn override_instructor_is_responsible() {
        let day = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap();
        let default_id = Uuid::new_v4();
        let override_id = Uuid::new_v4();
        let workshop = WorkshopModel {
            id: Uuid::new_v4(),
            title: "Pottery".into(),
            description: String::new(),
            is_series: true,
            price: 0,
            max_participants: None,
            category_id: Uuid::new_v4(),
            address_id: Uuid::new_v4(),
            default_instructor_id: Some(default_id),
            image_url: None,
            average_rating: 0.0,
            created_at: day.into(),
            updated_at: day.into(),
        };
        let mut c = cycle(None, day);
        assert_eq!(responsible_instructor(&c, &workshop), Some(default_id));
        c.instructor_override_id = Some(override_id);
        assert_eq!(responsible_instructor(&c, &workshop), Some(override_id));

        let default_instructor = AuthUser {
            user_id: default_id,
            roles: vec![Role::Instructor],
        };
        assert!(ensure_can_manage(&default_instructor, &c, &workshop).is_err());
    }

    #[test]
    fn named_instructor_without_the_role_is_forbidden() {
        let id = Uuid::new_v4();
        let participant = AuthUser {
            user_id: id,
            roles: vec![Role::Participant],
        };
        assert!(matches!(
            ensure_responsible(&participant, Some(id)),
            Err(AppError::Forbidden)
        ));

        let instructor = AuthUser {
            user_id: id,
            roles: vec![Role::Instructor],
        };
        assert!(ensure_responsible(&instructor, Some(id)).is_ok());
        assert!(ensure_responsible(&instructor, None).is_err());

        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            roles: vec![Role::Admin],
        };
        assert!(ensure_responsible(&admin, None).is_ok());
    }

    #[test]
    fn capacity_must_cover_active_enrollments() {
        assert!(ensure_fits(Some(3), 3).is_ok());
        assert!(matches!(ensure_fits(Some(2), 3), Err(AppError::BadRequest(_))));
        assert!(ensure_fits(None, 500).is_ok());
    }
}
