use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    availability::{self, Availability, TimeState},
    dto::enrollments::{
        EnrollRequest, EnrollResponse, EnrollmentList, EnrollmentView, Participant,
        ParticipantList,
    },
    entity::{
        enrollments::{
            ActiveModel as EnrollmentActive, Column as EnrollmentCol, Entity as Enrollments,
            Model as EnrollmentModel,
        },
        payments::ActiveModel as PaymentActive,
        users::Entity as Users,
        workshop_cycles::Entity as WorkshopCycles,
        workshop_sessions::Model as SessionModel,
        workshops::{Column as WorkshopCol, Entity as Workshops},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Enrollment, EnrollmentStatus, PaymentStatus},
    response::{ApiResponse, Meta},
    services::{
        cycle_service::{
            active_count, cycle_range, ensure_can_manage, find_cycle_with_workshop, sessions_for,
        },
        payment_service::{payment_from_entity, payment_states},
    },
    state::AppState,
};

/// Enrolls the caller in a cycle.
///
/// The cycle row is locked for the duration of the transaction, so concurrent
/// enrollments for the same cycle are serialized and the active count read
/// here is the one the insert is checked against.
pub async fn enroll(
    state: &AppState,
    user: &AuthUser,
    payload: EnrollRequest,
) -> AppResult<ApiResponse<EnrollResponse>> {
    let txn = state.orm.begin().await?;

    let cycle = WorkshopCycles::find_by_id(payload.cycle_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let workshop = Workshops::find_by_id(cycle.workshop_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("cycle {} has no workshop", cycle.id)))?;

    if !cycle.is_open_for_enrollment {
        return Err(AppError::BadRequest("Enrollment for this cycle is closed".into()));
    }

    let sessions = sessions_for(&txn, &[cycle.id]).await?;
    let range = cycle_range(&cycle, &sessions);
    if range.state_at(Utc::now()) == TimeState::Past {
        return Err(AppError::BadRequest("Cycle has already ended".into()));
    }

    let already = Enrollments::find()
        .filter(
            Condition::all()
                .add(EnrollmentCol::UserId.eq(user.user_id))
                .add(EnrollmentCol::CycleId.eq(cycle.id))
                .add(EnrollmentCol::Status.eq(EnrollmentStatus::Active.as_str())),
        )
        .one(&txn)
        .await?;
    if already.is_some() {
        return Err(AppError::Conflict("Already enrolled in this cycle".into()));
    }

    let capacity =
        availability::effective_capacity(cycle.max_participants_override, workshop.max_participants);
    let active = active_count(&txn, cycle.id).await?;
    if !Availability::compute(capacity, active).has_room() {
        return Err(AppError::Conflict("No seats left in this cycle".into()));
    }

    let enrollment = EnrollmentActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        cycle_id: Set(cycle.id),
        status: Set(EnrollmentStatus::Active.as_str().to_string()),
        enrolled_at: Set(Utc::now().into()),
        cancelled_at: Set(None),
    }
    .insert(&txn)
    .await?;

    let payment = if workshop.price > 0 {
        let payment = PaymentActive {
            id: Set(Uuid::new_v4()),
            enrollment_id: Set(enrollment.id),
            amount: Set(workshop.price),
            status: Set(PaymentStatus::Pending.as_str().to_string()),
            paid_at: Set(None),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        Some(payment_from_entity(payment))
    } else {
        None
    };

    txn.commit().await?;

    tracing::info!(
        cycle_id = %cycle.id,
        user_id = %user.user_id,
        active = active + 1,
        "enrollment created"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "enrollment_create",
        "enrollments",
        serde_json::json!({ "enrollment_id": enrollment.id, "cycle_id": cycle.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Enrolled",
        EnrollResponse {
            enrollment: enrollment_from_entity(enrollment),
            payment,
            availability: Availability::compute(capacity, active + 1),
        },
        Some(Meta::empty()),
    ))
}

pub async fn cancel_enrollment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Enrollment>> {
    let txn = state.orm.begin().await?;
    let enrollment = Enrollments::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if enrollment.user_id != user.user_id && !user.is_admin() {
        return Err(AppError::Forbidden);
    }
    if enrollment.status == EnrollmentStatus::Cancelled.as_str() {
        return Err(AppError::BadRequest("Enrollment is already cancelled".into()));
    }

    let mut active: EnrollmentActive = enrollment.into();
    active.status = Set(EnrollmentStatus::Cancelled.as_str().to_string());
    active.cancelled_at = Set(Some(Utc::now().into()));
    let enrollment = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "enrollment_cancel",
        "enrollments",
        serde_json::json!({ "enrollment_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Enrollment cancelled",
        enrollment_from_entity(enrollment),
        Some(Meta::empty()),
    ))
}

pub async fn my_enrollments(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<EnrollmentList>> {
    let rows = Enrollments::find()
        .filter(EnrollmentCol::UserId.eq(user.user_id))
        .order_by_desc(EnrollmentCol::EnrolledAt)
        .find_also_related(WorkshopCycles)
        .all(&state.orm)
        .await?;

    let cycle_ids: Vec<Uuid> = rows
        .iter()
        .filter_map(|(_, c)| c.as_ref().map(|c| c.id))
        .collect();
    let workshop_ids: Vec<Uuid> = rows
        .iter()
        .filter_map(|(_, c)| c.as_ref().map(|c| c.workshop_id))
        .collect();
    let enrollment_ids: Vec<Uuid> = rows.iter().map(|(e, _)| e.id).collect();

    let titles: HashMap<Uuid, String> = if workshop_ids.is_empty() {
        HashMap::new()
    } else {
        Workshops::find()
            .filter(WorkshopCol::Id.is_in(workshop_ids))
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|w| (w.id, w.title))
            .collect()
    };
    let mut sessions_by_cycle: HashMap<Uuid, Vec<SessionModel>> = HashMap::new();
    for session in sessions_for(&state.orm, &cycle_ids).await? {
        sessions_by_cycle
            .entry(session.cycle_id)
            .or_default()
            .push(session);
    }
    let payments = payment_states(&state.orm, &enrollment_ids).await?;

    let now = Utc::now();
    let mut items = Vec::with_capacity(rows.len());
    for (enrollment, cycle) in rows {
        let Some(cycle) = cycle else { continue };
        let sessions = sessions_by_cycle.get(&cycle.id).map(Vec::as_slice).unwrap_or(&[]);
        let range = cycle_range(&cycle, sessions);
        items.push(EnrollmentView {
            workshop_id: cycle.workshop_id,
            workshop_title: titles.get(&cycle.workshop_id).cloned().unwrap_or_default(),
            cycle_name: cycle.display_name,
            range_label: range.label(),
            time_state: range.state_at(now),
            payment_state: payments
                .get(&enrollment.id)
                .copied()
                .unwrap_or(availability::PaymentState::None),
            enrollment: enrollment_from_entity(enrollment),
        });
    }

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Enrollments",
        EnrollmentList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn cycle_participants(
    state: &AppState,
    user: &AuthUser,
    cycle_id: Uuid,
) -> AppResult<ApiResponse<ParticipantList>> {
    let (cycle, workshop) = find_cycle_with_workshop(&state.orm, cycle_id).await?;
    ensure_can_manage(user, &cycle, &workshop)?;

    let rows = Enrollments::find()
        .filter(EnrollmentCol::CycleId.eq(cycle_id))
        .order_by_asc(EnrollmentCol::EnrolledAt)
        .find_also_related(Users)
        .all(&state.orm)
        .await?;
    let enrollment_ids: Vec<Uuid> = rows.iter().map(|(e, _)| e.id).collect();
    let payments = payment_states(&state.orm, &enrollment_ids).await?;

    let active = rows
        .iter()
        .filter(|(e, _)| e.status == EnrollmentStatus::Active.as_str())
        .count() as i64;
    let capacity =
        availability::effective_capacity(cycle.max_participants_override, workshop.max_participants);

    let items = rows
        .into_iter()
        .filter_map(|(enrollment, participant)| {
            let participant = participant?;
            Some(Participant {
                email: participant.email,
                first_name: participant.first_name,
                last_name: participant.last_name,
                payment_state: payments
                    .get(&enrollment.id)
                    .copied()
                    .unwrap_or(availability::PaymentState::None),
                enrollment: enrollment_from_entity(enrollment),
            })
        })
        .collect();

    Ok(ApiResponse::success(
        "Participants",
        ParticipantList {
            availability: Availability::compute(capacity, active),
            items,
        },
        None,
    ))
}

pub(crate) fn enrollment_from_entity(model: EnrollmentModel) -> Enrollment {
    Enrollment {
        id: model.id,
        user_id: model.user_id,
        cycle_id: model.cycle_id,
        // Unknown values only appear if the column was edited by hand.
        status: model
            .status
            .parse()
            .unwrap_or(EnrollmentStatus::Cancelled),
        enrolled_at: model.enrolled_at.with_timezone(&Utc),
        cancelled_at: model.cancelled_at.map(|d| d.with_timezone(&Utc)),
    }
}
