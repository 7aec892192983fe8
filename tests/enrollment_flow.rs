mod common;

use chrono::{Duration, Utc};
use workshop_booking_api::{
    availability::{PaymentState, TimeState},
    dto::enrollments::EnrollRequest,
    error::AppError,
    models::{EnrollmentStatus, PaymentStatus, Role},
    routes::params::{LogQuery, PaymentQuery},
    services::{
        cycle_service, enrollment_service, log_service, payment_service, report_service,
        workshop_service,
    },
};

// Capacity one: first participant enrolls, second is turned away until the
// first cancels; the admin then settles the second participant's payment.
#[tokio::test]
async fn capacity_cancel_and_payment_flow() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let admin = common::create_user(&state, "admin@example.com", &[Role::Admin]).await?;
    let alice = common::create_user(&state, "alice@example.com", &[Role::Participant]).await?;
    let bob = common::create_user(&state, "bob@example.com", &[Role::Participant]).await?;

    let workshop_id = common::create_workshop(&state, &admin, None, 5000, Some(1)).await?;
    let start = Utc::now() + Duration::days(7);
    let cycle_id = common::create_cycle(&state, &admin, workshop_id, start, None).await?;

    let first = enrollment_service::enroll(&state, &alice, EnrollRequest { cycle_id })
        .await?
        .data
        .expect("enrollment");
    assert_eq!(first.enrollment.status, EnrollmentStatus::Active);
    assert_eq!(first.availability.display, "0/1");
    let payment = first.payment.expect("pending payment for a paid workshop");
    assert_eq!(payment.amount, 5000);
    assert_eq!(payment.status, PaymentStatus::Pending);

    let full = enrollment_service::enroll(&state, &bob, EnrollRequest { cycle_id }).await;
    assert!(matches!(full, Err(AppError::Conflict(_))), "cycle should be full");

    let twice = enrollment_service::enroll(&state, &alice, EnrollRequest { cycle_id }).await;
    assert!(matches!(twice, Err(AppError::Conflict(_))));

    // Someone else's enrollment cannot be cancelled.
    let foreign = enrollment_service::cancel_enrollment(&state, &bob, first.enrollment.id).await;
    assert!(matches!(foreign, Err(AppError::Forbidden)));

    let cancelled = enrollment_service::cancel_enrollment(&state, &alice, first.enrollment.id)
        .await?
        .data
        .expect("cancelled enrollment");
    assert_eq!(cancelled.status, EnrollmentStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());

    let again = enrollment_service::cancel_enrollment(&state, &alice, first.enrollment.id).await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));

    let second = enrollment_service::enroll(&state, &bob, EnrollRequest { cycle_id })
        .await?
        .data
        .expect("enrollment after a seat was freed");
    let bob_payment = second.payment.expect("pending payment");

    let not_admin = payment_service::mark_paid(&state, &bob, bob_payment.id).await;
    assert!(matches!(not_admin, Err(AppError::Forbidden)));

    let paid = payment_service::mark_paid(&state, &admin, bob_payment.id)
        .await?
        .data
        .expect("paid payment");
    assert_eq!(paid.status, PaymentStatus::Paid);
    assert!(paid.paid_at.is_some());

    let paid_twice = payment_service::mark_paid(&state, &admin, bob_payment.id).await;
    assert!(matches!(paid_twice, Err(AppError::BadRequest(_))));

    let mine = enrollment_service::my_enrollments(&state, &bob)
        .await?
        .data
        .expect("enrollments");
    assert_eq!(mine.items.len(), 1);
    assert_eq!(mine.items[0].payment_state, PaymentState::Paid);
    assert_eq!(mine.items[0].time_state, TimeState::Upcoming);
    assert_eq!(mine.items[0].workshop_title, "Pottery");

    let alice_mine = enrollment_service::my_enrollments(&state, &alice)
        .await?
        .data
        .expect("enrollments");
    assert_eq!(alice_mine.items[0].payment_state, PaymentState::Pending);

    let participants = enrollment_service::cycle_participants(&state, &admin, cycle_id)
        .await?
        .data
        .expect("participants");
    assert_eq!(participants.items.len(), 2);
    assert_eq!(participants.availability.active, 1);
    assert_eq!(participants.availability.seats_left, Some(0));

    let pending = payment_service::list_payments(
        &state,
        &admin,
        PaymentQuery {
            status: Some(PaymentStatus::Pending),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("payments");
    assert_eq!(pending.items.len(), 1);

    let revenue = report_service::revenue(&state, &admin)
        .await?
        .data
        .expect("revenue");
    let row = revenue
        .items
        .iter()
        .find(|r| r.workshop_id == workshop_id)
        .expect("workshop revenue row");
    assert_eq!(row.paid_total, 5000);
    assert_eq!(row.pending_total, 5000);
    assert_eq!(row.paid_count, 1);

    let occupancy = report_service::occupancy(&state, &admin)
        .await?
        .data
        .expect("occupancy");
    let row = occupancy
        .items
        .iter()
        .find(|r| r.cycle_id == cycle_id)
        .expect("cycle occupancy row");
    assert_eq!(row.availability.display, "0/1");

    let denied = report_service::occupancy(&state, &bob).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let logs = log_service::list_logs(
        &state,
        &admin,
        LogQuery {
            action: Some("enrollment_create".into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(logs.meta.and_then(|m| m.total), Some(2));

    // Payment history is visible to the enrollment owner and admins only.
    let own = payment_service::payments_for_enrollment(&state, &bob, second.enrollment.id)
        .await?
        .data
        .expect("own payments");
    assert_eq!(own.items.len(), 1);
    assert_eq!(own.items[0].id, bob_payment.id);
    let foreign =
        payment_service::payments_for_enrollment(&state, &alice, second.enrollment.id).await;
    assert!(matches!(foreign, Err(AppError::Forbidden)));
    let audited = payment_service::payments_for_enrollment(&state, &admin, second.enrollment.id)
        .await?
        .data
        .expect("payments for admin");
    assert_eq!(audited.items.len(), 1);

    // No seat is taken any more, but recorded payments still block deletes.
    enrollment_service::cancel_enrollment(&state, &bob, second.enrollment.id).await?;
    let cycle_delete = cycle_service::delete_cycle(&state, &admin, cycle_id).await;
    assert!(matches!(cycle_delete, Err(AppError::BadRequest(_))));
    let workshop_delete = workshop_service::delete_workshop(&state, &admin, workshop_id).await;
    assert!(matches!(workshop_delete, Err(AppError::BadRequest(_))));

    let revenue = report_service::revenue(&state, &admin)
        .await?
        .data
        .expect("revenue");
    let row = revenue
        .items
        .iter()
        .find(|r| r.workshop_id == workshop_id)
        .expect("revenue survives the rejected deletes");
    assert_eq!(row.paid_total, 5000);

    Ok(())
}
