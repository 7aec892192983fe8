mod common;

use chrono::{Duration, Utc};
use uuid::Uuid;
use workshop_booking_api::{
    dto::{
        addresses::AddressRequest,
        cycles::{SessionRequest, UpdateCycleRequest},
        enrollments::EnrollRequest,
        reviews::CreateReviewRequest,
        users::SetRolesRequest,
    },
    error::AppError,
    models::Role,
    services::{
        address_service, category_service, cycle_service, enrollment_service, payment_service,
        report_service, review_service, user_service, workshop_service,
    },
    state::AppState,
};

// Role management, account removal, the instructor report and reference
// guards on shared catalog records.
#[tokio::test]
async fn user_admin_reports_and_reference_guards() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::create_user(&state, "admin@example.com", &[Role::Admin]).await?;
    let ivan = common::create_user(&state, "ivan@example.com", &[Role::Instructor]).await?;
    let jane = common::create_user(&state, "jane@example.com", &[Role::Instructor]).await?;
    let paula = common::create_user(&state, "paula@example.com", &[Role::Participant]).await?;
    let quinn = common::create_user(&state, "quinn@example.com", &[Role::Participant]).await?;
    let rita = common::create_user(&state, "rita@example.com", &[Role::Participant]).await?;

    // Roles.
    let roles = |roles: Vec<Role>| SetRolesRequest { roles };
    let not_admin =
        user_service::set_roles(&state, &paula, quinn.user_id, roles(vec![Role::Admin])).await;
    assert!(matches!(not_admin, Err(AppError::Forbidden)));
    let empty = user_service::set_roles(&state, &admin, paula.user_id, roles(vec![])).await;
    assert!(matches!(empty, Err(AppError::BadRequest(_))));
    let self_demotion =
        user_service::set_roles(&state, &admin, admin.user_id, roles(vec![Role::Instructor])).await;
    assert!(matches!(self_demotion, Err(AppError::BadRequest(_))));
    let promoted = user_service::set_roles(
        &state,
        &admin,
        rita.user_id,
        roles(vec![Role::Participant, Role::Instructor]),
    )
    .await?
    .data
    .expect("user");
    assert!(promoted.roles.contains(&Role::Instructor));
    assert!(promoted.roles.contains(&Role::Participant));

    // Instructor report: the override instructor owns the second cycle.
    let workshop_id = common::create_workshop(&state, &admin, Some(ivan.user_id), 0, None).await?;
    let start = Utc::now() + Duration::days(10);
    let ivans = common::create_cycle(&state, &admin, workshop_id, start, None).await?;
    let janes = common::create_cycle(&state, &admin, workshop_id, start, None).await?;
    cycle_service::update_cycle(
        &state,
        &admin,
        janes,
        UpdateCycleRequest {
            instructor_override_id: Some(Some(jane.user_id)),
            ..Default::default()
        },
    )
    .await?;
    let paula_seat = enrollment_service::enroll(&state, &paula, EnrollRequest { cycle_id: ivans })
        .await?
        .data
        .expect("enrollment");

    let report = report_service::instructors(&state, &admin)
        .await?
        .data
        .expect("instructor report");
    let row = |id: Uuid| report.items.iter().find(|r| r.instructor_id == id);
    let ivan_row = row(ivan.user_id).expect("ivan row");
    assert_eq!((ivan_row.cycle_count, ivan_row.active_participants), (1, 1));
    let jane_row = row(jane.user_id).expect("jane row");
    assert_eq!((jane_row.cycle_count, jane_row.active_participants), (1, 0));
    assert!(matches!(
        report_service::instructors(&state, &ivan).await,
        Err(AppError::Forbidden)
    ));

    // Catalog records in use cannot be deleted.
    let details = workshop_service::get_workshop(&state, workshop_id)
        .await?
        .data
        .expect("workshop");
    let category_in_use =
        category_service::delete_category(&state, &admin, details.category.id).await;
    assert!(matches!(category_in_use, Err(AppError::BadRequest(_))));
    let address_in_use = address_service::delete_address(&state, &admin, details.address.id).await;
    assert!(matches!(address_in_use, Err(AppError::BadRequest(_))));

    let studio = address_service::create_address(
        &state,
        &admin,
        AddressRequest {
            street: "Kiln Lane".into(),
            building_number: "7".into(),
            apartment_number: None,
            city: "Springfield".into(),
            postal_code: "12-345".into(),
        },
    )
    .await?
    .data
    .expect("address");
    cycle_service::add_session(
        &state,
        &jane,
        janes,
        SessionRequest {
            topic: "Raku".into(),
            start_time: start + Duration::days(1),
            end_time: start + Duration::days(1) + Duration::hours(3),
            address_id: Some(studio.id),
        },
    )
    .await?;
    let session_address = address_service::delete_address(&state, &admin, studio.id).await;
    assert!(matches!(session_address, Err(AppError::BadRequest(_))));

    // Account removal guards.
    let self_delete = user_service::delete_user(&state, &admin, admin.user_id).await;
    assert!(matches!(self_delete, Err(AppError::BadRequest(_))));
    let by_participant = user_service::delete_user(&state, &quinn, paula.user_id).await;
    assert!(matches!(by_participant, Err(AppError::Forbidden)));
    let with_seat = user_service::delete_user(&state, &admin, paula.user_id).await;
    assert!(matches!(with_seat, Err(AppError::BadRequest(_))));

    let paid_workshop = common::create_workshop(&state, &admin, None, 3000, None).await?;
    let paid_cycle = common::create_cycle(&state, &admin, paid_workshop, start, None).await?;
    let quinn_seat = enrollment_service::enroll(&state, &quinn, EnrollRequest { cycle_id: paid_cycle })
        .await?
        .data
        .expect("enrollment");
    let payment = quinn_seat.payment.expect("pending payment");
    payment_service::mark_paid(&state, &admin, payment.id).await?;
    enrollment_service::cancel_enrollment(&state, &quinn, quinn_seat.enrollment.id).await?;
    let with_payment = user_service::delete_user(&state, &admin, quinn.user_id).await;
    assert!(matches!(with_payment, Err(AppError::BadRequest(_))));

    // Removing a reviewer moves the workshop average.
    let rated = common::create_workshop(&state, &admin, None, 0, None).await?;
    let ongoing = common::create_cycle(
        &state,
        &admin,
        rated,
        Utc::now() - Duration::days(1),
        Some(Utc::now() + Duration::days(1)),
    )
    .await?;
    let mut seats = Vec::new();
    for (user, rating) in [(&paula, 1_i16), (&rita, 5)] {
        let seat = enrollment_service::enroll(&state, user, EnrollRequest { cycle_id: ongoing })
            .await?
            .data
            .expect("enrollment");
        seats.push(seat.enrollment.id);
        review_service::create_review(
            &state,
            user,
            CreateReviewRequest {
                workshop_id: rated,
                rating,
                comment: String::new(),
            },
        )
        .await?;
    }
    assert_eq!(average_rating(&state, rated).await?, 3.0);

    enrollment_service::cancel_enrollment(&state, &paula, paula_seat.enrollment.id).await?;
    enrollment_service::cancel_enrollment(&state, &paula, seats[0]).await?;
    user_service::delete_user(&state, &admin, paula.user_id).await?;
    assert_eq!(average_rating(&state, rated).await?, 5.0);

    let gone = user_service::delete_user(&state, &admin, paula.user_id).await;
    assert!(matches!(gone, Err(AppError::NotFound)));

    Ok(())
}

async fn average_rating(state: &AppState, workshop_id: Uuid) -> anyhow::Result<f64> {
    let details = workshop_service::get_workshop(state, workshop_id)
        .await?
        .data
        .expect("workshop");
    Ok(details.workshop.average_rating)
}
