use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    availability::{self, Availability},
    dto::reports::{
        InstructorReport, InstructorRow, OccupancyReport, OccupancyRow, RevenueReport, RevenueRow,
    },
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    response::ApiResponse,
    state::AppState,
};

#[derive(FromRow)]
struct OccupancyQueryRow {
    cycle_id: Uuid,
    cycle_name: String,
    workshop_id: Uuid,
    workshop_title: String,
    max_participants: Option<i32>,
    max_participants_override: Option<i32>,
    active: i64,
}

pub async fn occupancy(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OccupancyReport>> {
    ensure_admin(user)?;
    let rows = sqlx::query_as::<_, OccupancyQueryRow>(
        r#"
        SELECT c.id AS cycle_id, c.display_name AS cycle_name,
               w.id AS workshop_id, w.title AS workshop_title,
               w.max_participants, c.max_participants_override,
               COUNT(e.id) FILTER (WHERE e.status = 'Active') AS active
        FROM workshop_cycles c
        JOIN workshops w ON w.id = c.workshop_id
        LEFT JOIN enrollments e ON e.cycle_id = c.id
        GROUP BY c.id, w.id
        ORDER BY w.title, c.start_date
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| {
            let capacity =
                availability::effective_capacity(row.max_participants_override, row.max_participants);
            OccupancyRow {
                cycle_id: row.cycle_id,
                cycle_name: row.cycle_name,
                workshop_id: row.workshop_id,
                workshop_title: row.workshop_title,
                availability: Availability::compute(capacity, row.active),
            }
        })
        .collect();

    Ok(ApiResponse::success("Occupancy", OccupancyReport { items }, None))
}

pub async fn revenue(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<RevenueReport>> {
    ensure_admin(user)?;
    let rows = sqlx::query_as::<_, (Uuid, String, i64, i64, i64)>(
        r#"
        SELECT w.id, w.title,
               COALESCE(SUM(p.amount) FILTER (WHERE p.status = 'Paid'), 0)::BIGINT,
               COALESCE(SUM(p.amount) FILTER (WHERE p.status = 'Pending'), 0)::BIGINT,
               COUNT(p.id) FILTER (WHERE p.status = 'Paid')
        FROM workshops w
        LEFT JOIN workshop_cycles c ON c.workshop_id = w.id
        LEFT JOIN enrollments e ON e.cycle_id = c.id
        LEFT JOIN payments p ON p.enrollment_id = e.id
        GROUP BY w.id
        ORDER BY w.title
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let items = rows
        .into_iter()
        .map(
            |(workshop_id, workshop_title, paid_total, pending_total, paid_count)| RevenueRow {
                workshop_id,
                workshop_title,
                paid_total,
                pending_total,
                paid_count,
            },
        )
        .collect();

    Ok(ApiResponse::success("Revenue", RevenueReport { items }, None))
}

pub async fn instructors(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<InstructorReport>> {
    ensure_admin(user)?;
    // A cycle belongs to its override instructor, falling back to the workshop default.
    let rows = sqlx::query_as::<_, (Uuid, String, i64, i64)>(
        r#"
        SELECT u.id, u.email,
               COUNT(DISTINCT c.id),
               COUNT(e.id) FILTER (WHERE e.status = 'Active')
        FROM workshop_cycles c
        JOIN workshops w ON w.id = c.workshop_id
        JOIN users u ON u.id = COALESCE(c.instructor_override_id, w.default_instructor_id)
        LEFT JOIN enrollments e ON e.cycle_id = c.id
        GROUP BY u.id
        ORDER BY u.email
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let items = rows
        .into_iter()
        .map(
            |(instructor_id, email, cycle_count, active_participants)| InstructorRow {
                instructor_id,
                email,
                cycle_count,
                active_participants,
            },
        )
        .collect();

    Ok(ApiResponse::success("Instructors", InstructorReport { items }, None))
}
