use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, LockType};
use uuid::Uuid;

use crate::{
    audit,
    dto::workshops::{CreateWorkshopRequest, UpdateWorkshopRequest, WorkshopDetails, WorkshopList},
    entity::{
        addresses::Entity as Addresses,
        categories::Entity as Categories,
        enrollments::{
            Column as EnrollmentCol, Entity as Enrollments, Relation as EnrollmentRelation,
        },
        payments::Entity as Payments,
        reviews::{Column as ReviewCol, Entity as Reviews},
        workshop_cycles::{Column as CycleCol, Entity as WorkshopCycles},
        workshops::{ActiveModel, Column, Entity as Workshops, Model as WorkshopModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{EnrollmentStatus, Workshop},
    response::{ApiResponse, Meta},
    routes::params::{SortOrder, WorkshopQuery, WorkshopSortBy},
    services::{
        address_service::address_from_entity, category_service::category_from_entity,
        cycle_service::{
            active_counts, ensure_fits, ensure_responsible, sessions_for, summarize_cycles,
        },
        user_service::ensure_instructor,
    },
    state::AppState,
};

pub async fn list_workshops(
    state: &AppState,
    query: WorkshopQuery,
) -> AppResult<ApiResponse<WorkshopList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Title).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }
    if let Some(category_id) = query.category_id {
        condition = condition.add(Column::CategoryId.eq(category_id));
    }
    if let Some(is_series) = query.is_series {
        condition = condition.add(Column::IsSeries.eq(is_series));
    }

    let sort_col = match query.sort_by.unwrap_or(WorkshopSortBy::CreatedAt) {
        WorkshopSortBy::CreatedAt => Column::CreatedAt,
        WorkshopSortBy::Title => Column::Title,
        WorkshopSortBy::Price => Column::Price,
        WorkshopSortBy::Rating => Column::AverageRating,
    };

    let mut finder = Workshops::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(workshop_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Workshops",
        WorkshopList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_workshop(state: &AppState, id: Uuid) -> AppResult<ApiResponse<WorkshopDetails>> {
    let workshop = Workshops::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let category = Categories::find_by_id(workshop.category_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("workshop {id} has no category")))?;
    let address = Addresses::find_by_id(workshop.address_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("workshop {id} has no address")))?;

    let cycles = WorkshopCycles::find()
        .filter(CycleCol::WorkshopId.eq(id))
        .order_by_asc(CycleCol::StartDate)
        .all(&state.orm)
        .await?;
    let cycles = summarize_cycles(&state.orm, cycles, Utc::now()).await?;

    Ok(ApiResponse::success(
        "Workshop",
        WorkshopDetails {
            workshop: workshop_from_entity(workshop),
            category: category_from_entity(category),
            address: address_from_entity(address),
            cycles,
        },
        None,
    ))
}

pub async fn create_workshop(
    state: &AppState,
    user: &AuthUser,
    payload: CreateWorkshopRequest,
) -> AppResult<ApiResponse<Workshop>> {
    ensure_admin(user)?;
    let title = validate_title(&payload.title)?;
    validate_numbers(Some(payload.price), payload.max_participants)?;
    ensure_references(&state.orm, Some(payload.category_id), Some(payload.address_id)).await?;
    if let Some(instructor_id) = payload.default_instructor_id {
        ensure_instructor(&state.orm, instructor_id).await?;
    }

    let workshop = ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        description: Set(payload.description),
        is_series: Set(payload.is_series),
        price: Set(payload.price),
        max_participants: Set(payload.max_participants),
        category_id: Set(payload.category_id),
        address_id: Set(payload.address_id),
        default_instructor_id: Set(payload.default_instructor_id),
        image_url: Set(payload.image_url),
        average_rating: Set(0.0),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "workshop_create",
        "workshops",
        serde_json::json!({ "workshop_id": workshop.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Workshop created",
        workshop_from_entity(workshop),
        Some(Meta::empty()),
    ))
}

pub async fn update_workshop(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateWorkshopRequest,
) -> AppResult<ApiResponse<Workshop>> {
    let txn = state.orm.begin().await?;
    let existing = Workshops::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    ensure_responsible(user, existing.default_instructor_id)?;
    // Reassigning a workshop is an admin decision.
    if !user.is_admin() && payload.default_instructor_id.is_some() {
        return Err(AppError::Forbidden);
    }

    let max_participants = payload
        .max_participants
        .unwrap_or(existing.max_participants);
    validate_numbers(payload.price, max_participants)?;
    ensure_references(&txn, payload.category_id, payload.address_id).await?;
    if let Some(Some(instructor_id)) = payload.default_instructor_id {
        ensure_instructor(&txn, instructor_id).await?;
    }

    if payload.max_participants.is_some() {
        // Cycles without an override inherit the new capacity.
        let inheriting: Vec<Uuid> = WorkshopCycles::find()
            .filter(CycleCol::WorkshopId.eq(id))
            .filter(CycleCol::MaxParticipantsOverride.is_null())
            .lock(LockType::Update)
            .all(&txn)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        for active in active_counts(&txn, &inheriting).await?.into_values() {
            ensure_fits(max_participants, active)?;
        }
    }
    if payload.is_series == Some(false) && existing.is_series {
        ensure_single_sessions(&txn, id).await?;
    }

    let mut active: ActiveModel = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(validate_title(&title)?);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(is_series) = payload.is_series {
        active.is_series = Set(is_series);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if payload.max_participants.is_some() {
        active.max_participants = Set(max_participants);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(address_id) = payload.address_id {
        active.address_id = Set(address_id);
    }
    if let Some(instructor_id) = payload.default_instructor_id {
        active.default_instructor_id = Set(instructor_id);
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(image_url);
    }
    active.updated_at = Set(Utc::now().into());

    let workshop = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "workshop_update",
        "workshops",
        serde_json::json!({ "workshop_id": workshop.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        workshop_from_entity(workshop),
        Some(Meta::empty()),
    ))
}

/// A single-event workshop holds at most one session per cycle.
async fn ensure_single_sessions<C: ConnectionTrait>(conn: &C, workshop_id: Uuid) -> AppResult<()> {
    let cycle_ids: Vec<Uuid> = WorkshopCycles::find()
        .filter(CycleCol::WorkshopId.eq(workshop_id))
        .lock(LockType::Update)
        .all(conn)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();

    let mut per_cycle: HashMap<Uuid, usize> = HashMap::new();
    for session in sessions_for(conn, &cycle_ids).await? {
        *per_cycle.entry(session.cycle_id).or_default() += 1;
    }
    if per_cycle.values().any(|&n| n > 1) {
        return Err(AppError::BadRequest(
            "A cycle of this workshop holds several sessions".into(),
        ));
    }
    Ok(())
}

pub async fn delete_workshop(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    Workshops::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let enrollments = Enrollments::find()
        .inner_join(WorkshopCycles)
        .filter(CycleCol::WorkshopId.eq(id))
        .filter(EnrollmentCol::Status.eq(EnrollmentStatus::Active.as_str()))
        .count(&txn)
        .await?;
    if enrollments > 0 {
        return Err(AppError::BadRequest(
            "Workshop has active enrollments".into(),
        ));
    }
    let payments = Payments::find()
        .inner_join(Enrollments)
        .join(JoinType::InnerJoin, EnrollmentRelation::WorkshopCycles.def())
        .filter(CycleCol::WorkshopId.eq(id))
        .count(&txn)
        .await?;
    if payments > 0 {
        return Err(AppError::BadRequest(
            "Workshop has recorded payments and cannot be deleted".into(),
        ));
    }

    Workshops::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "workshop_delete",
        "workshops",
        serde_json::json!({ "workshop_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Recomputes `average_rating` from the reviews table.
pub(crate) async fn refresh_average_rating<C: ConnectionTrait>(
    conn: &C,
    workshop_id: Uuid,
) -> AppResult<f64> {
    #[derive(Debug, FromQueryResult)]
    struct AvgRow {
        average: Option<f64>,
    }

    let row = Reviews::find()
        .select_only()
        .column_as(
            Expr::cust("CAST(AVG(rating) AS DOUBLE PRECISION)"),
            "average",
        )
        .filter(ReviewCol::WorkshopId.eq(workshop_id))
        .into_model::<AvgRow>()
        .one(conn)
        .await?;
    let average = row.and_then(|r| r.average).map(round_rating).unwrap_or(0.0);

    Workshops::update_many()
        .col_expr(Column::AverageRating, Expr::value(average))
        .filter(Column::Id.eq(workshop_id))
        .exec(conn)
        .await?;

    Ok(average)
}

fn round_rating(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

async fn ensure_references<C: ConnectionTrait>(
    conn: &C,
    category_id: Option<Uuid>,
    address_id: Option<Uuid>,
) -> AppResult<()> {
    if let Some(category_id) = category_id {
        if Categories::find_by_id(category_id)
            .one(conn)
            .await?
            .is_none()
        {
            return Err(AppError::BadRequest("Category not found".into()));
        }
    }
    if let Some(address_id) = address_id {
        if Addresses::find_by_id(address_id)
            .one(conn)
            .await?
            .is_none()
        {
            return Err(AppError::BadRequest("Address not found".into()));
        }
    }
    Ok(())
}

fn validate_title(raw: &str) -> AppResult<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }
    Ok(title.to_string())
}

fn validate_numbers(price: Option<i64>, max_participants: Option<i32>) -> AppResult<()> {
    if price.is_some_and(|p| p < 0) {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if max_participants.is_some_and(|m| m < 1) {
        return Err(AppError::BadRequest("max_participants must be at least 1".into()));
    }
    Ok(())
}

pub(crate) fn workshop_from_entity(model: WorkshopModel) -> Workshop {
    Workshop {
        id: model.id,
        title: model.title,
        description: model.description,
        is_series: model.is_series,
        price: model.price,
        max_participants: model.max_participants,
        category_id: model.category_id,
        address_id: model.address_id,
        default_instructor_id: model.default_instructor_id,
        image_url: model.image_url,
        average_rating: model.average_rating,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_price_and_zero_capacity() {
        assert!(validate_numbers(Some(-1), None).is_err());
        assert!(validate_numbers(None, Some(0)).is_err());
        assert!(validate_numbers(Some(0), Some(1)).is_ok());
        assert!(validate_numbers(None, None).is_ok());
    }

    #[test]
    fn ratings_round_to_two_places() {
        assert_eq!(round_rating(4.0 / 3.0), 1.33);
        assert_eq!(round_rating(4.666_666), 4.67);
    }
}
