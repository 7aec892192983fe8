use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post, put},
};
use uuid::Uuid;

use crate::{
    dto::cycles::{
        CreateCycleRequest, CycleDetails, CycleList, SessionRequest, SetEnrollmentOpenRequest,
        UpdateCycleRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{WorkshopCycle, WorkshopSession},
    response::ApiResponse,
    routes::params::CycleQuery,
    services::cycle_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cycles).post(create_cycle))
        .route("/mine", get(my_cycles))
        .route("/{id}", get(get_cycle).put(update_cycle).delete(delete_cycle))
        .route("/{id}/enrollment", patch(set_enrollment_open))
        .route("/{id}/sessions", post(add_session))
        .route(
            "/{id}/sessions/{session_id}",
            put(update_session).delete(delete_session),
        )
}

#[utoipa::path(
    get,
    path = "/api/workshopcycles",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("workshop_id" = Option<Uuid>, Query, description = "Filter by workshop"),
        ("open_only" = Option<bool>, Query, description = "Only cycles open for enrollment")
    ),
    responses(
        (status = 200, description = "List cycles with availability", body = ApiResponse<CycleList>)
    ),
    tag = "Cycles"
)]
pub async fn list_cycles(
    State(state): State<AppState>,
    Query(query): Query<CycleQuery>,
) -> AppResult<Json<ApiResponse<CycleList>>> {
    let resp = cycle_service::list_cycles(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/workshopcycles/mine",
    responses(
        (status = 200, description = "Cycles taught by the caller", body = ApiResponse<CycleList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Cycles"
)]
pub async fn my_cycles(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CycleList>>> {
    let resp = cycle_service::my_cycles(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/workshopcycles/{id}",
    params(("id" = Uuid, Path, description = "Cycle ID")),
    responses(
        (status = 200, description = "Cycle with sessions", body = ApiResponse<CycleDetails>),
        (status = 404, description = "Cycle not found")
    ),
    tag = "Cycles"
)]
pub async fn get_cycle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CycleDetails>>> {
    let resp = cycle_service::get_cycle(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/workshopcycles",
    request_body = CreateCycleRequest,
    responses(
        (status = 200, description = "Create cycle", body = ApiResponse<WorkshopCycle>),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Cycles"
)]
pub async fn create_cycle(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCycleRequest>,
) -> AppResult<Json<ApiResponse<WorkshopCycle>>> {
    let resp = cycle_service::create_cycle(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/workshopcycles/{id}",
    params(("id" = Uuid, Path, description = "Cycle ID")),
    request_body = UpdateCycleRequest,
    responses(
        (status = 200, description = "Update cycle", body = ApiResponse<WorkshopCycle>),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Cycle not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cycles"
)]
pub async fn update_cycle(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCycleRequest>,
) -> AppResult<Json<ApiResponse<WorkshopCycle>>> {
    let resp = cycle_service::update_cycle(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/workshopcycles/{id}/enrollment",
    params(("id" = Uuid, Path, description = "Cycle ID")),
    request_body = SetEnrollmentOpenRequest,
    responses(
        (status = 200, description = "Open or close enrollment", body = ApiResponse<WorkshopCycle>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Cycles"
)]
pub async fn set_enrollment_open(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetEnrollmentOpenRequest>,
) -> AppResult<Json<ApiResponse<WorkshopCycle>>> {
    let resp = cycle_service::set_enrollment_open(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/workshopcycles/{id}",
    params(("id" = Uuid, Path, description = "Cycle ID")),
    responses(
        (status = 200, description = "Delete cycle"),
        (status = 400, description = "Cycle has active enrollments"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Cycles"
)]
pub async fn delete_cycle(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = cycle_service::delete_cycle(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/workshopcycles/{id}/sessions",
    params(("id" = Uuid, Path, description = "Cycle ID")),
    request_body = SessionRequest,
    responses(
        (status = 200, description = "Add session", body = ApiResponse<WorkshopSession>),
        (status = 400, description = "Invalid session"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Cycles"
)]
pub async fn add_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SessionRequest>,
) -> AppResult<Json<ApiResponse<WorkshopSession>>> {
    let resp = cycle_service::add_session(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/workshopcycles/{id}/sessions/{session_id}",
    params(
        ("id" = Uuid, Path, description = "Cycle ID"),
        ("session_id" = Uuid, Path, description = "Session ID")
    ),
    request_body = SessionRequest,
    responses(
        (status = 200, description = "Update session", body = ApiResponse<WorkshopSession>),
        (status = 400, description = "Invalid session"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cycles"
)]
pub async fn update_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, session_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<SessionRequest>,
) -> AppResult<Json<ApiResponse<WorkshopSession>>> {
    let resp = cycle_service::update_session(&state, &user, id, session_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/workshopcycles/{id}/sessions/{session_id}",
    params(
        ("id" = Uuid, Path, description = "Cycle ID"),
        ("session_id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Delete session"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cycles"
)]
pub async fn delete_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, session_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = cycle_service::delete_session(&state, &user, id, session_id).await?;
    Ok(Json(resp))
}
