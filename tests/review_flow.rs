mod common;

use chrono::{Duration, Utc};
use workshop_booking_api::{
    dto::{enrollments::EnrollRequest, reviews::CreateReviewRequest},
    error::AppError,
    models::Role,
    routes::params::Pagination,
    services::{enrollment_service, review_service, workshop_service},
};

// Only people enrolled in a started cycle may review, once per workshop; the
// workshop's average follows reviews being added and removed.
#[tokio::test]
async fn review_eligibility_and_average_rating() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let admin = common::create_user(&state, "admin@example.com", &[Role::Admin]).await?;
    let dana = common::create_user(&state, "dana@example.com", &[Role::Participant]).await?;
    let eve = common::create_user(&state, "eve@example.com", &[Role::Participant]).await?;
    let frank = common::create_user(&state, "frank@example.com", &[Role::Participant]).await?;

    let workshop_id = common::create_workshop(&state, &admin, None, 0, Some(10)).await?;
    let ongoing = common::create_cycle(
        &state,
        &admin,
        workshop_id,
        Utc::now() - Duration::days(1),
        Some(Utc::now() + Duration::days(5)),
    )
    .await?;
    let upcoming = common::create_cycle(
        &state,
        &admin,
        workshop_id,
        Utc::now() + Duration::days(20),
        None,
    )
    .await?;

    enrollment_service::enroll(&state, &dana, EnrollRequest { cycle_id: ongoing }).await?;
    enrollment_service::enroll(&state, &eve, EnrollRequest { cycle_id: upcoming }).await?;

    let review = |rating: i16| CreateReviewRequest {
        workshop_id,
        rating,
        comment: "Lovely evening".into(),
    };

    let outsider = review_service::create_review(&state, &frank, review(5)).await;
    assert!(matches!(outsider, Err(AppError::BadRequest(_))));

    let too_early = review_service::create_review(&state, &eve, review(5)).await;
    assert!(matches!(too_early, Err(AppError::BadRequest(_))));

    let out_of_range = review_service::create_review(&state, &dana, review(6)).await;
    assert!(matches!(out_of_range, Err(AppError::BadRequest(_))));

    let created = review_service::create_review(&state, &dana, review(4))
        .await?
        .data
        .expect("review");
    assert_eq!(created.rating, 4);

    let duplicate = review_service::create_review(&state, &dana, review(2)).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let details = workshop_service::get_workshop(&state, workshop_id)
        .await?
        .data
        .expect("workshop");
    assert!((details.workshop.average_rating - 4.0).abs() < f64::EPSILON);
    assert_eq!(details.cycles.len(), 2);

    let listed = review_service::list_reviews(&state, workshop_id, Pagination::default())
        .await?;
    assert_eq!(listed.meta.and_then(|m| m.total), Some(1));

    let not_owner = review_service::delete_review(&state, &eve, created.id).await;
    assert!(matches!(not_owner, Err(AppError::Forbidden)));

    review_service::delete_review(&state, &admin, created.id).await?;
    let details = workshop_service::get_workshop(&state, workshop_id)
        .await?
        .data
        .expect("workshop");
    assert_eq!(details.workshop.average_rating, 0.0);

    Ok(())
}
