use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::workshops::{CreateWorkshopRequest, UpdateWorkshopRequest, WorkshopDetails, WorkshopList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Workshop,
    response::ApiResponse,
    routes::params::WorkshopQuery,
    services::workshop_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_workshops).post(create_workshop))
        .route(
            "/{id}",
            get(get_workshop).put(update_workshop).delete(delete_workshop),
        )
}

#[utoipa::path(
    get,
    path = "/api/workshops",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search in title and description"),
        ("category_id" = Option<Uuid>, Query, description = "Filter by category"),
        ("is_series" = Option<bool>, Query, description = "Filter series or single workshops"),
        ("sort_by" = Option<String>, Query, description = "Sort by: created_at, title, price, rating"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "List workshops", body = ApiResponse<WorkshopList>)
    ),
    tag = "Workshops"
)]
pub async fn list_workshops(
    State(state): State<AppState>,
    Query(query): Query<WorkshopQuery>,
) -> AppResult<Json<ApiResponse<WorkshopList>>> {
    let resp = workshop_service::list_workshops(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/workshops/{id}",
    params(("id" = Uuid, Path, description = "Workshop ID")),
    responses(
        (status = 200, description = "Workshop with its cycles", body = ApiResponse<WorkshopDetails>),
        (status = 404, description = "Workshop not found")
    ),
    tag = "Workshops"
)]
pub async fn get_workshop(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<WorkshopDetails>>> {
    let resp = workshop_service::get_workshop(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/workshops",
    request_body = CreateWorkshopRequest,
    responses(
        (status = 200, description = "Create workshop", body = ApiResponse<Workshop>),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Workshops"
)]
pub async fn create_workshop(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateWorkshopRequest>,
) -> AppResult<Json<ApiResponse<Workshop>>> {
    let resp = workshop_service::create_workshop(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/workshops/{id}",
    params(("id" = Uuid, Path, description = "Workshop ID")),
    request_body = UpdateWorkshopRequest,
    responses(
        (status = 200, description = "Update workshop", body = ApiResponse<Workshop>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Workshop not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Workshops"
)]
pub async fn update_workshop(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateWorkshopRequest>,
) -> AppResult<Json<ApiResponse<Workshop>>> {
    let resp = workshop_service::update_workshop(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/workshops/{id}",
    params(("id" = Uuid, Path, description = "Workshop ID")),
    responses(
        (status = 200, description = "Delete workshop"),
        (status = 400, description = "Workshop has active enrollments"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Workshops"
)]
pub async fn delete_workshop(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = workshop_service::delete_workshop(&state, &user, id).await?;
    Ok(Json(resp))
}
