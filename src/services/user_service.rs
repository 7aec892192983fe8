use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, JoinType, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait, TransactionTrait,
};
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    dto::users::{SetRolesRequest, UserList},
    entity::{
        enrollments::{Column as EnrollmentCol, Entity as Enrollments},
        payments::{Column as PaymentCol, Entity as Payments},
        reviews::{Column as ReviewCol, Entity as Reviews},
        roles::{Column as RoleCol, Entity as Roles},
        user_roles::{Column as UserRoleCol, Entity as UserRoles, Relation as UserRoleRelation},
        users::{Column as UserCol, Entity as Users},
        workshops::{Column as WorkshopCol, Entity as Workshops},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{EnrollmentStatus, PaymentStatus, Role, User},
    response::{ApiResponse, Meta},
    routes::params::UserQuery,
    services::{
        auth_service::{load_roles, replace_roles, user_from_entity},
        workshop_service::refresh_average_rating,
    },
    state::AppState,
};

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    query: UserQuery,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = Users::find().order_by_asc(UserCol::Email);
    if let Some(role) = query.role {
        finder = finder
            .inner_join(UserRoles)
            .join(JoinType::InnerJoin, UserRoleRelation::Roles.def())
            .filter(RoleCol::Name.eq(role.as_str()));
    }

    let total = finder.clone().count(&state.orm).await? as i64;
    let users = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
    let mut roles = roles_by_user(&state.orm, &ids).await?;
    let items = users
        .into_iter()
        .map(|u| {
            let user_roles = roles.remove(&u.id).unwrap_or_default();
            user_from_entity(u, user_roles)
        })
        .collect();

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn set_roles(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: SetRolesRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    if payload.roles.is_empty() {
        return Err(AppError::BadRequest("At least one role is required".into()));
    }
    if id == user.user_id && !payload.roles.contains(&Role::Admin) {
        return Err(AppError::BadRequest("Admins cannot revoke their own Admin role".into()));
    }

    let target = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let txn = state.orm.begin().await?;
    replace_roles(&txn, id, &payload.roles).await?;
    txn.commit().await?;

    let roles = load_roles(&state.orm, id).await?;
    tracing::info!(user_id = %id, roles = ?roles, "roles replaced");
    audit::record(
        &state.pool,
        user.user_id,
        "user_roles_set",
        "users",
        serde_json::json!({ "user_id": id, "roles": roles }),
    )
    .await;

    Ok(ApiResponse::success(
        "Roles updated",
        user_from_entity(target, roles),
        Some(Meta::empty()),
    ))
}

pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    if id == user.user_id {
        return Err(AppError::BadRequest("Admins cannot delete themselves".into()));
    }

    let txn = state.orm.begin().await?;
    // Workshops first, then the user: the same order `create_review` takes them in.
    let reviewed = reviewed_workshops(&txn, id).await?;
    Workshops::find()
        .filter(WorkshopCol::Id.is_in(reviewed.clone()))
        .order_by_asc(WorkshopCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    Users::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let active = Enrollments::find()
        .filter(EnrollmentCol::UserId.eq(id))
        .filter(EnrollmentCol::Status.eq(EnrollmentStatus::Active.as_str()))
        .count(&txn)
        .await?;
    if active > 0 {
        return Err(AppError::BadRequest(
            "User has active enrollments; cancel them first".into(),
        ));
    }
    let paid = Payments::find()
        .inner_join(Enrollments)
        .filter(EnrollmentCol::UserId.eq(id))
        .filter(PaymentCol::Status.eq(PaymentStatus::Paid.as_str()))
        .count(&txn)
        .await?;
    if paid > 0 {
        return Err(AppError::BadRequest(
            "User has paid payments on record and cannot be deleted".into(),
        ));
    }

    // Reviews go with the user, so their workshops' averages move too.
    Users::delete_by_id(id).exec(&txn).await?;
    for workshop_id in &reviewed {
        refresh_average_rating(&txn, *workshop_id).await?;
    }
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "user_delete",
        "users",
        serde_json::json!({ "user_id": id, "reviewed_workshops": reviewed }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

async fn reviewed_workshops<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<Vec<Uuid>> {
    let ids: Vec<Uuid> = Reviews::find()
        .select_only()
        .column(ReviewCol::WorkshopId)
        .filter(ReviewCol::UserId.eq(user_id))
        .into_tuple()
        .all(conn)
        .await?;
    Ok(ids)
}

/// Rejects ids that do not belong to a user holding the Instructor role.
pub async fn ensure_instructor<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<()> {
    let roles = load_roles(conn, user_id).await?;
    if !roles.contains(&Role::Instructor) {
        return Err(AppError::BadRequest(format!(
            "User {user_id} is not an instructor"
        )));
    }
    Ok(())
}

async fn roles_by_user<C: ConnectionTrait>(
    conn: &C,
    ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<Role>>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let links = UserRoles::find()
        .filter(UserRoleCol::UserId.is_in(ids.to_vec()))
        .find_also_related(Roles)
        .all(conn)
        .await?;

    let mut by_user: HashMap<Uuid, Vec<Role>> = HashMap::new();
    for (link, role) in links {
        if let Some(role) = role.and_then(|r| r.name.parse::<Role>().ok()) {
            by_user.entry(link.user_id).or_default().push(role);
        }
    }
    for roles in by_user.values_mut() {
        roles.sort_by_key(|r| r.as_str());
    }
    Ok(by_user)
}
