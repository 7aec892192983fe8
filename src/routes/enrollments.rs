use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::enrollments::{EnrollRequest, EnrollResponse, EnrollmentList, ParticipantList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Enrollment,
    response::ApiResponse,
    services::enrollment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(enroll))
        .route("/mine", get(my_enrollments))
        .route("/{id}/cancel", post(cancel_enrollment))
        .route("/cycle/{cycle_id}", get(cycle_participants))
}

#[utoipa::path(
    post,
    path = "/api/enrollments",
    request_body = EnrollRequest,
    responses(
        (status = 200, description = "Enrolled", body = ApiResponse<EnrollResponse>),
        (status = 400, description = "Enrollment closed or cycle ended"),
        (status = 404, description = "Cycle not found"),
        (status = 409, description = "Already enrolled or no seats left")
    ),
    security(("bearer_auth" = [])),
    tag = "Enrollments"
)]
pub async fn enroll(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<EnrollRequest>,
) -> AppResult<Json<ApiResponse<EnrollResponse>>> {
    let resp = enrollment_service::enroll(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/enrollments/{id}/cancel",
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    responses(
        (status = 200, description = "Enrollment cancelled", body = ApiResponse<Enrollment>),
        (status = 400, description = "Already cancelled"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Enrollment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Enrollments"
)]
pub async fn cancel_enrollment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Enrollment>>> {
    let resp = enrollment_service::cancel_enrollment(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/enrollments/mine",
    responses(
        (status = 200, description = "Caller's enrollments", body = ApiResponse<EnrollmentList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Enrollments"
)]
pub async fn my_enrollments(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<EnrollmentList>>> {
    let resp = enrollment_service::my_enrollments(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/enrollments/cycle/{cycle_id}",
    params(("cycle_id" = Uuid, Path, description = "Cycle ID")),
    responses(
        (status = 200, description = "Participants of a cycle", body = ApiResponse<ParticipantList>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Cycle not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Enrollments"
)]
pub async fn cycle_participants(
    State(state): State<AppState>,
    user: AuthUser,
    Path(cycle_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ParticipantList>>> {
    let resp = enrollment_service::cycle_participants(&state, &user, cycle_id).await?;
    Ok(Json(resp))
}
