mod common;

use chrono::{Duration, Utc};
use workshop_booking_api::{
    dto::{
        cycles::{CreateCycleRequest, SessionRequest, UpdateCycleRequest},
        enrollments::EnrollRequest,
        workshops::UpdateWorkshopRequest,
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::Role,
    services::{cycle_service, enrollment_service, workshop_service},
};

// Capacity and series edits must never strand enrollments or sessions that
// already exist, and nullable fields can be cleared again.
#[tokio::test]
async fn capacity_and_series_edits_keep_existing_bookings_valid() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::create_user(&state, "admin@example.com", &[Role::Admin]).await?;
    let ivan = common::create_user(&state, "ivan@example.com", &[Role::Instructor]).await?;
    let workshop_id = common::create_workshop(&state, &admin, Some(ivan.user_id), 0, Some(5)).await?;
    let cycle_id =
        common::create_cycle(&state, &admin, workshop_id, Utc::now() + Duration::days(4), None)
            .await?;

    for i in 0..4 {
        let email = format!("guest{i}@example.com");
        let guest = common::create_user(&state, &email, &[Role::Participant]).await?;
        enrollment_service::enroll(&state, &guest, EnrollRequest { cycle_id }).await?;
    }

    // The cycle inherits the workshop capacity, so shrinking below four fails.
    let shrink = workshop_service::update_workshop(
        &state,
        &ivan,
        workshop_id,
        UpdateWorkshopRequest {
            max_participants: Some(Some(1)),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(shrink, Err(AppError::BadRequest(_))));

    let fits = workshop_service::update_workshop(
        &state,
        &ivan,
        workshop_id,
        UpdateWorkshopRequest {
            max_participants: Some(Some(4)),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("workshop");
    assert_eq!(fits.max_participants, Some(4));

    // An override takes over from the workshop capacity.
    let override_low = cycle_service::update_cycle(
        &state,
        &ivan,
        cycle_id,
        UpdateCycleRequest {
            max_participants_override: Some(Some(3)),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(override_low, Err(AppError::BadRequest(_))));

    let overridden = cycle_service::update_cycle(
        &state,
        &ivan,
        cycle_id,
        UpdateCycleRequest {
            max_participants_override: Some(Some(10)),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("cycle");
    assert_eq!(overridden.max_participants_override, Some(10));

    // With an override in place the workshop may shrink; clearing the
    // override is then checked against that smaller capacity.
    workshop_service::update_workshop(
        &state,
        &admin,
        workshop_id,
        UpdateWorkshopRequest {
            max_participants: Some(Some(2)),
            image_url: Some(Some("https://example.com/clay.png".into())),
            ..Default::default()
        },
    )
    .await?;
    let clear_to_small = cycle_service::update_cycle(
        &state,
        &ivan,
        cycle_id,
        UpdateCycleRequest {
            max_participants_override: Some(None),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(clear_to_small, Err(AppError::BadRequest(_))));

    let unlimited = workshop_service::update_workshop(
        &state,
        &admin,
        workshop_id,
        UpdateWorkshopRequest {
            max_participants: Some(None),
            image_url: Some(None),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("workshop");
    assert_eq!(unlimited.max_participants, None);
    assert_eq!(unlimited.image_url, None);

    let cleared = cycle_service::update_cycle(
        &state,
        &ivan,
        cycle_id,
        UpdateCycleRequest {
            max_participants_override: Some(None),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("cycle");
    assert_eq!(cleared.max_participants_override, None);
    let details = cycle_service::get_cycle(&state, cycle_id)
        .await?
        .data
        .expect("cycle details");
    assert_eq!(details.summary.availability.display, "Unlimited");

    // Only admins reassign a workshop, and an instructor cannot unassign themselves.
    let unassign = workshop_service::update_workshop(
        &state,
        &ivan,
        workshop_id,
        UpdateWorkshopRequest {
            default_instructor_id: Some(None),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(unassign, Err(AppError::Forbidden)));

    // Two sessions in one cycle need the workshop to stay a series.
    workshop_service::update_workshop(
        &state,
        &admin,
        workshop_id,
        UpdateWorkshopRequest {
            is_series: Some(true),
            ..Default::default()
        },
    )
    .await?;
    let first_day = Utc::now() + Duration::days(4);
    for (day, topic) in [(0, "Throwing"), (7, "Glazing")] {
        cycle_service::add_session(
            &state,
            &ivan,
            cycle_id,
            SessionRequest {
                topic: topic.into(),
                start_time: first_day + Duration::days(day),
                end_time: first_day + Duration::days(day) + Duration::hours(2),
                address_id: None,
            },
        )
        .await?;
    }
    let single = workshop_service::update_workshop(
        &state,
        &admin,
        workshop_id,
        UpdateWorkshopRequest {
            is_series: Some(false),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(single, Err(AppError::BadRequest(_))));

    // A token still naming ivan but without the Instructor role is not enough.
    let demoted = AuthUser {
        user_id: ivan.user_id,
        roles: vec![Role::Participant],
    };
    let request = |display_name: &str| CreateCycleRequest {
        workshop_id,
        display_name: display_name.into(),
        start_date: Utc::now() + Duration::days(30),
        end_date: None,
        is_open_for_enrollment: None,
        max_participants_override: None,
        address_id: None,
        instructor_override_id: None,
    };
    let denied = cycle_service::create_cycle(&state, &demoted, request("Autumn")).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));
    cycle_service::create_cycle(&state, &ivan, request("Autumn")).await?;

    Ok(())
}
