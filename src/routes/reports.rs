use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::reports::{InstructorReport, OccupancyReport, RevenueReport},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::report_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/occupancy", get(occupancy))
        .route("/revenue", get(revenue))
        .route("/instructors", get(instructors))
}

#[utoipa::path(
    get,
    path = "/api/reports/occupancy",
    responses(
        (status = 200, description = "Seats taken per cycle", body = ApiResponse<OccupancyReport>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn occupancy(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<OccupancyReport>>> {
    let resp = report_service::occupancy(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/reports/revenue",
    responses(
        (status = 200, description = "Paid and pending totals per workshop", body = ApiResponse<RevenueReport>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn revenue(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<RevenueReport>>> {
    let resp = report_service::revenue(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/reports/instructors",
    responses(
        (status = 200, description = "Cycles and participants per instructor", body = ApiResponse<InstructorReport>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn instructors(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<InstructorReport>>> {
    let resp = report_service::instructors(&state, &user).await?;
    Ok(Json(resp))
}
