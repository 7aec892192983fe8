use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::logs::AuditLogList,
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::LogQuery,
    services::log_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_logs))
}

#[utoipa::path(
    get,
    path = "/api/logs",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("action" = Option<String>, Query, description = "Filter by action, e.g. enrollment_create")
    ),
    responses(
        (status = 200, description = "Audit log (admin only)", body = ApiResponse<AuditLogList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_logs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LogQuery>,
) -> AppResult<Json<ApiResponse<AuditLogList>>> {
    let resp = log_service::list_logs(&state, &user, query).await?;
    Ok(Json(resp))
}
