use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    availability::{self, PaymentState},
    dto::payments::{CreatePaymentRequest, PaymentList},
    entity::{
        enrollments::Entity as Enrollments,
        payments::{ActiveModel, Column, Entity as Payments, Model as PaymentModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Payment, PaymentStatus},
    response::{ApiResponse, Meta},
    routes::params::PaymentQuery,
    state::AppState,
};

pub async fn list_payments(
    state: &AppState,
    user: &AuthUser,
    query: PaymentQuery,
) -> AppResult<ApiResponse<PaymentList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = Payments::find().order_by_desc(Column::CreatedAt);
    if let Some(status) = query.status {
        finder = finder.filter(Column::Status.eq(status.as_str()));
    }

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(payment_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Payments",
        PaymentList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn payments_for_enrollment(
    state: &AppState,
    user: &AuthUser,
    enrollment_id: Uuid,
) -> AppResult<ApiResponse<PaymentList>> {
    let enrollment = Enrollments::find_by_id(enrollment_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if enrollment.user_id != user.user_id && !user.is_admin() {
        return Err(AppError::Forbidden);
    }

    let items: Vec<Payment> = Payments::find()
        .filter(Column::EnrollmentId.eq(enrollment_id))
        .order_by_asc(Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(payment_from_entity)
        .collect();
    let total = items.len() as i64;

    Ok(ApiResponse::success(
        "Payments",
        PaymentList { items },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn create_payment(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePaymentRequest,
) -> AppResult<ApiResponse<Payment>> {
    ensure_admin(user)?;
    if payload.amount <= 0 {
        return Err(AppError::BadRequest("amount must be positive".into()));
    }
    if Enrollments::find_by_id(payload.enrollment_id)
        .one(&state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::BadRequest("Enrollment not found".into()));
    }

    let payment = ActiveModel {
        id: Set(Uuid::new_v4()),
        enrollment_id: Set(payload.enrollment_id),
        amount: Set(payload.amount),
        status: Set(PaymentStatus::Pending.as_str().to_string()),
        paid_at: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "payment_create",
        "payments",
        serde_json::json!({ "payment_id": payment.id, "enrollment_id": payment.enrollment_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment created",
        payment_from_entity(payment),
        Some(Meta::empty()),
    ))
}

pub async fn mark_paid(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;

    let payment = Payments::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if payment.status == PaymentStatus::Paid.as_str() {
        return Err(AppError::BadRequest("Payment already paid".into()));
    }

    let mut active: ActiveModel = payment.into();
    active.status = Set(PaymentStatus::Paid.as_str().to_string());
    active.paid_at = Set(Some(Utc::now().into()));
    let payment = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(payment_id = %id, amount = payment.amount, "payment marked paid");
    audit::record(
        &state.pool,
        user.user_id,
        "payment_paid",
        "payments",
        serde_json::json!({ "payment_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment recorded",
        payment_from_entity(payment),
        Some(Meta::empty()),
    ))
}

/// Payment state per enrollment; enrollments without payments are absent.
pub(crate) async fn payment_states<C: ConnectionTrait>(
    conn: &C,
    enrollment_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, PaymentState>> {
    if enrollment_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let payments = Payments::find()
        .filter(Column::EnrollmentId.is_in(enrollment_ids.to_vec()))
        .all(conn)
        .await?;

    let mut statuses: HashMap<Uuid, Vec<PaymentStatus>> = HashMap::new();
    for payment in payments {
        if let Ok(status) = payment.status.parse::<PaymentStatus>() {
            statuses.entry(payment.enrollment_id).or_default().push(status);
        }
    }
    Ok(statuses
        .into_iter()
        .map(|(id, s)| (id, availability::payment_state(s)))
        .collect())
}

pub(crate) fn payment_from_entity(model: PaymentModel) -> Payment {
    Payment {
        id: model.id,
        enrollment_id: model.enrollment_id,
        amount: model.amount,
        status: model.status.parse().unwrap_or(PaymentStatus::Pending),
        paid_at: model.paid_at.map(|d| d.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
    }
}
