use chrono::{Duration, Utc};
use uuid::Uuid;
use workshop_booking_api::{
    config::AppConfig,
    db::{create_pool, orm_from_pool, run_migrations},
    models::Role,
    services::auth_service::{hash_password, replace_roles},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "admin123", &[Role::Admin]).await?;
    let instructor_id = ensure_user(
        &pool,
        "instructor@example.com",
        "instructor123",
        &[Role::Instructor, Role::Participant],
    )
    .await?;
    let participant_id =
        ensure_user(&pool, "participant@example.com", "participant123", &[Role::Participant])
            .await?;

    let category_id = ensure_category(&pool, "Ceramics", "Wheel throwing and hand building").await?;
    ensure_category(&pool, "Photography", "Film and digital photography").await?;
    let address_id = ensure_address(&pool).await?;
    seed_workshops(&pool, category_id, address_id, instructor_id).await?;

    println!(
        "Seed completed. Admin: {admin_id}, Instructor: {instructor_id}, Participant: {participant_id}"
    );
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    roles: &[Role],
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, last_name)
        VALUES ($1, $2, $3, $4, 'Example')
        ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(email.split('@').next().unwrap_or(email))
    .fetch_one(pool)
    .await?;

    let orm = orm_from_pool(pool);
    replace_roles(&orm, row.0, roles)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let names: Vec<&str> = roles.iter().map(Role::as_str).collect();
    println!("Ensured user {email} (roles={})", names.join(","));
    Ok(row.0)
}

async fn ensure_category(pool: &sqlx::PgPool, name: &str, description: &str) -> anyhow::Result<Uuid> {
    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO categories (id, name, description)
        VALUES ($1, $2, $3)
        ON CONFLICT (name) DO UPDATE SET description = EXCLUDED.description
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(description)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

async fn ensure_address(pool: &sqlx::PgPool) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM addresses WHERE street = $1 AND building_number = $2")
            .bind("Market Street")
            .bind("12")
            .fetch_optional(pool)
            .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO addresses (id, street, building_number, apartment_number, city, postal_code)
        VALUES ($1, 'Market Street', '12', '3', 'Springfield', '00-950')
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

async fn seed_workshops(
    pool: &sqlx::PgPool,
    category_id: Uuid,
    address_id: Uuid,
    instructor_id: Uuid,
) -> anyhow::Result<()> {
    let workshops = vec![
        ("Intro to Pottery", "One evening at the wheel", false, 12000_i64, Some(8_i32), 1),
        ("Pottery Course", "Six weekly sessions from clay to glaze", true, 48000, Some(10), 6),
        ("Open Studio", "Free drop-in studio time", false, 0, None, 1),
    ];

    for (title, description, is_series, price, max_participants, session_count) in workshops {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM workshops WHERE title = $1")
            .bind(title)
            .fetch_optional(pool)
            .await?;
        if exists.is_some() {
            continue;
        }

        let mut tx = pool.begin().await?;
        let workshop_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO workshops
                (id, title, description, is_series, price, max_participants,
                 category_id, address_id, default_instructor_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(workshop_id)
        .bind(title)
        .bind(description)
        .bind(is_series)
        .bind(price)
        .bind(max_participants)
        .bind(category_id)
        .bind(address_id)
        .bind(instructor_id)
        .execute(&mut *tx)
        .await?;

        let start = Utc::now() + Duration::days(14);
        let cycle_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO workshop_cycles (id, workshop_id, display_name, start_date, is_open_for_enrollment)
            VALUES ($1, $2, $3, $4, TRUE)
            "#,
        )
        .bind(cycle_id)
        .bind(workshop_id)
        .bind(format!("{title} - {}", start.format("%B %Y")))
        .bind(start)
        .execute(&mut *tx)
        .await?;

        for week in 0..session_count {
            let session_start = start + Duration::weeks(week);
            sqlx::query(
                r#"
                INSERT INTO workshop_sessions (id, cycle_id, topic, start_time, end_time)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(cycle_id)
            .bind(format!("Session {}", week + 1))
            .bind(session_start)
            .bind(session_start + Duration::hours(3))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        println!("Seeded workshop {title}");
    }

    Ok(())
}
