use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    availability::TimeState,
    dto::reviews::{CreateReviewRequest, ReviewList},
    entity::{
        enrollments::{Column as EnrollmentCol, Entity as Enrollments},
        reviews::{ActiveModel, Column, Entity as Reviews, Model as ReviewModel},
        workshop_cycles::{Column as CycleCol, Entity as WorkshopCycles},
        workshops::Entity as Workshops,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Review,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::{
        cycle_service::{cycle_range, sessions_for},
        workshop_service::refresh_average_rating,
    },
    state::AppState,
};

pub async fn list_reviews(
    state: &AppState,
    workshop_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<ReviewList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Reviews::find()
        .filter(Column::WorkshopId.eq(workshop_id))
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(review_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Reviews",
        ReviewList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn create_review(
    state: &AppState,
    user: &AuthUser,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
    }
    // Reviews of one workshop are serialized on its row, which keeps the
    // one-review rule and the average consistent.
    let txn = state.orm.begin().await?;
    if Workshops::find_by_id(payload.workshop_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound);
    }

    let existing = Reviews::find()
        .filter(
            Condition::all()
                .add(Column::UserId.eq(user.user_id))
                .add(Column::WorkshopId.eq(payload.workshop_id)),
        )
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("You have already reviewed this workshop".into()));
    }

    if !has_attended(&txn, user.user_id, payload.workshop_id).await? {
        return Err(AppError::BadRequest(
            "Only participants of a started cycle can review this workshop".into(),
        ));
    }

    let review = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        workshop_id: Set(payload.workshop_id),
        rating: Set(payload.rating),
        comment: Set(payload.comment.trim().to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;
    let average = refresh_average_rating(&txn, payload.workshop_id).await?;
    txn.commit().await?;

    tracing::debug!(workshop_id = %payload.workshop_id, average, "rating refreshed");
    audit::record(
        &state.pool,
        user.user_id,
        "review_create",
        "reviews",
        serde_json::json!({ "review_id": review.id, "workshop_id": review.workshop_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Review created",
        review_from_entity(review),
        Some(Meta::empty()),
    ))
}

pub async fn delete_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let review = Reviews::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if review.user_id != user.user_id && !user.is_admin() {
        return Err(AppError::Forbidden);
    }

    let txn = state.orm.begin().await?;
    Workshops::find_by_id(review.workshop_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    Reviews::delete_by_id(id).exec(&txn).await?;
    refresh_average_rating(&txn, review.workshop_id).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "review_delete",
        "reviews",
        serde_json::json!({ "review_id": id, "workshop_id": review.workshop_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// True when the user holds an enrollment in a cycle of the workshop that has started.
async fn has_attended<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    workshop_id: Uuid,
) -> AppResult<bool> {
    let cycles = WorkshopCycles::find()
        .inner_join(Enrollments)
        .filter(EnrollmentCol::UserId.eq(user_id))
        .filter(CycleCol::WorkshopId.eq(workshop_id))
        .distinct()
        .all(conn)
        .await?;
    if cycles.is_empty() {
        return Ok(false);
    }

    let ids: Vec<Uuid> = cycles.iter().map(|c| c.id).collect();
    let sessions = sessions_for(conn, &ids).await?;
    let now = Utc::now();
    Ok(cycles.iter().any(|cycle| {
        let own: Vec<_> = sessions
            .iter()
            .filter(|s| s.cycle_id == cycle.id)
            .cloned()
            .collect();
        cycle_range(cycle, &own).state_at(now) != TimeState::Upcoming
    }))
}

fn review_from_entity(model: ReviewModel) -> Review {
    Review {
        id: model.id,
        user_id: model.user_id,
        workshop_id: model.workshop_id,
        rating: model.rating,
        comment: model.comment,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
