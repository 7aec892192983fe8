use axum::Router;

use crate::state::AppState;

pub mod addresses;
pub mod auth;
pub mod categories;
pub mod cycles;
pub mod doc;
pub mod enrollments;
pub mod health;
pub mod logs;
pub mod params;
pub mod payments;
pub mod reports;
pub mod reviews;
pub mod users;
pub mod workshops;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/categories", categories::router())
        .nest("/addresses", addresses::router())
        .nest("/workshops", workshops::router())
        .nest("/workshopcycles", cycles::router())
        .nest("/enrollments", enrollments::router())
        .nest("/payments", payments::router())
        .nest("/reviews", reviews::router())
        .nest("/users", users::router())
        .nest("/logs", logs::router())
        .nest("/reports", reports::router())
}
