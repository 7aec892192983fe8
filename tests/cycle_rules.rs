mod common;

use chrono::{Duration, SubsecRound, Utc};
use workshop_booking_api::{
    availability::TimeState,
    dto::{
        cycles::{SessionRequest, SetEnrollmentOpenRequest},
        enrollments::EnrollRequest,
    },
    error::AppError,
    models::Role,
    services::{cycle_service, enrollment_service},
};

#[tokio::test]
async fn closed_and_past_cycles_reject_enrollment() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::create_user(&state, "admin2@example.com", &[Role::Admin]).await?;
    let carol = common::create_user(&state, "carol@example.com", &[Role::Participant]).await?;
    let workshop_id = common::create_workshop(&state, &admin, None, 0, None).await?;

    let past_start = Utc::now() - Duration::days(10);
    let past = common::create_cycle(
        &state,
        &admin,
        workshop_id,
        past_start,
        Some(past_start + Duration::days(1)),
    )
    .await?;
    let result = enrollment_service::enroll(&state, &carol, EnrollRequest { cycle_id: past }).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let upcoming =
        common::create_cycle(&state, &admin, workshop_id, Utc::now() + Duration::days(3), None)
            .await?;
    cycle_service::set_enrollment_open(
        &state,
        &admin,
        upcoming,
        SetEnrollmentOpenRequest { open: false },
    )
    .await?;
    let result =
        enrollment_service::enroll(&state, &carol, EnrollRequest { cycle_id: upcoming }).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    cycle_service::set_enrollment_open(
        &state,
        &admin,
        upcoming,
        SetEnrollmentOpenRequest { open: true },
    )
    .await?;
    let free = enrollment_service::enroll(&state, &carol, EnrollRequest { cycle_id: upcoming })
        .await?
        .data
        .expect("enrollment");
    assert!(free.payment.is_none(), "free workshops create no payment");
    assert_eq!(free.availability.display, "Unlimited");

    // Sessions: a single-event workshop holds one, and it must end after it starts.
    // Postgres keeps microseconds; whole seconds compare cleanly after a round trip.
    let session_start = (Utc::now() + Duration::days(3)).trunc_subsecs(0);
    let backwards = cycle_service::add_session(
        &state,
        &admin,
        upcoming,
        SessionRequest {
            topic: "Glazing".into(),
            start_time: session_start,
            end_time: session_start - Duration::hours(1),
            address_id: None,
        },
    )
    .await;
    assert!(matches!(backwards, Err(AppError::BadRequest(_))));

    let session = SessionRequest {
        topic: "Glazing".into(),
        start_time: session_start + Duration::days(1),
        end_time: session_start + Duration::days(1) + Duration::hours(2),
        address_id: None,
    };
    cycle_service::add_session(&state, &admin, upcoming, session).await?;
    let second = cycle_service::add_session(
        &state,
        &admin,
        upcoming,
        SessionRequest {
            topic: "Firing".into(),
            start_time: session_start + Duration::days(2),
            end_time: session_start + Duration::days(2) + Duration::hours(2),
            address_id: None,
        },
    )
    .await;
    assert!(matches!(second, Err(AppError::BadRequest(_))));

    // Sessions take precedence over the cycle's own dates.
    let details = cycle_service::get_cycle(&state, upcoming)
        .await?
        .data
        .expect("cycle details");
    assert_eq!(details.sessions.len(), 1);
    assert_eq!(details.summary.range.start, session_start + Duration::days(1));
    assert_eq!(details.summary.time_state, TimeState::Upcoming);
    assert!(details.summary.countdown.is_some());
    assert_eq!(details.summary.availability.active, 1);

    // Participants cannot manage cycles.
    let forbidden = cycle_service::set_enrollment_open(
        &state,
        &carol,
        upcoming,
        SetEnrollmentOpenRequest { open: false },
    )
    .await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));

    let busy = cycle_service::delete_cycle(&state, &admin, upcoming).await;
    assert!(matches!(busy, Err(AppError::BadRequest(_))));
    cycle_service::delete_cycle(&state, &admin, past).await?;

    Ok(())
}
