use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::{
    dto::logs::AuditLogList,
    entity::audit_logs::{Column, Entity as AuditLogs, Model as AuditLogModel},
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    models::AuditLog,
    response::{ApiResponse, Meta},
    routes::params::LogQuery,
    state::AppState,
};

pub async fn list_logs(
    state: &AppState,
    user: &AuthUser,
    query: LogQuery,
) -> AppResult<ApiResponse<AuditLogList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = AuditLogs::find().order_by_desc(Column::CreatedAt);
    if let Some(action) = query.action.as_deref().filter(|a| !a.is_empty()) {
        finder = finder.filter(Column::Action.eq(action));
    }

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(log_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Logs",
        AuditLogList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

fn log_from_entity(model: AuditLogModel) -> AuditLog {
    AuditLog {
        id: model.id,
        user_id: model.user_id,
        action: model.action,
        resource: model.resource,
        metadata: model.metadata,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
