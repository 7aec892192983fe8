#![allow(dead_code)]

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, Statement};
use uuid::Uuid;
use workshop_booking_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::{
        addresses::AddressRequest,
        auth::RegisterRequest,
        categories::CategoryRequest,
        cycles::CreateCycleRequest,
        workshops::CreateWorkshopRequest,
    },
    middleware::auth::AuthUser,
    models::Role,
    services::{
        address_service, auth_service, category_service, cycle_service, workshop_service,
    },
    state::AppState,
};

/// Returns `None` when no database is configured so the caller can skip.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;

    let state = AppState::new(pool, test_config(&database_url));

    // Clean tables between runs; roles stay seeded by the migration.
    let backend = state.orm.get_database_backend();
    state
        .orm
        .execute(Statement::from_string(
            backend,
            "TRUNCATE TABLE audit_logs, reviews, payments, enrollments, workshop_sessions, \
             workshop_cycles, workshops, addresses, categories, user_roles, users CASCADE",
        ))
        .await?;

    Ok(Some(state))
}

pub fn test_config(database_url: &str) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        jwt_ttl_hours: 1,
        cors_origins: Vec::new(),
    }
}

pub async fn create_user(state: &AppState, email: &str, roles: &[Role]) -> anyhow::Result<AuthUser> {
    let user = auth_service::register_user(
        state,
        RegisterRequest {
            email: email.to_string(),
            password: "password123".into(),
            first_name: "Test".into(),
            last_name: "User".into(),
        },
    )
    .await?
    .data
    .expect("registered user");

    auth_service::replace_roles(&state.orm, user.id, roles).await?;
    Ok(AuthUser {
        user_id: user.id,
        roles: roles.to_vec(),
    })
}

/// Category, address and a workshop owned by `instructor`.
pub async fn create_workshop(
    state: &AppState,
    admin: &AuthUser,
    instructor: Option<Uuid>,
    price: i64,
    max_participants: Option<i32>,
) -> anyhow::Result<Uuid> {
    let category = category_service::create_category(
        state,
        admin,
        CategoryRequest {
            name: format!("Category {}", Uuid::new_v4()),
            description: None,
        },
    )
    .await?
    .data
    .expect("category");

    let address = address_service::create_address(
        state,
        admin,
        AddressRequest {
            street: "Main Street".into(),
            building_number: "1".into(),
            apartment_number: None,
            city: "Springfield".into(),
            postal_code: "12-345".into(),
        },
    )
    .await?
    .data
    .expect("address");

    let workshop = workshop_service::create_workshop(
        state,
        admin,
        CreateWorkshopRequest {
            title: "Pottery".into(),
            description: "Clay and wheel".into(),
            is_series: false,
            price,
            max_participants,
            category_id: category.id,
            address_id: address.id,
            default_instructor_id: instructor,
            image_url: None,
        },
    )
    .await?
    .data
    .expect("workshop");

    Ok(workshop.id)
}

pub async fn create_cycle(
    state: &AppState,
    admin: &AuthUser,
    workshop_id: Uuid,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
) -> anyhow::Result<Uuid> {
    let cycle = cycle_service::create_cycle(
        state,
        admin,
        CreateCycleRequest {
            workshop_id,
            display_name: "Spring".into(),
            start_date,
            end_date,
            is_open_for_enrollment: Some(true),
            max_participants_override: None,
            address_id: None,
            instructor_override_id: None,
        },
    )
    .await?
    .data
    .expect("cycle");

    Ok(cycle.id)
}
