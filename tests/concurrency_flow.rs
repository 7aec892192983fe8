mod common;

use chrono::{Duration, Utc};
use workshop_booking_api::{
    dto::{enrollments::EnrollRequest, reviews::CreateReviewRequest},
    error::AppError,
    models::Role,
    routes::params::Pagination,
    services::{enrollment_service, review_service, workshop_service},
};

// Parallel requests against the same rows: seats never exceed capacity, a
// participant ends up with a single review, and the average sees every review.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_enrollments_and_reviews_respect_invariants() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };
    let admin = common::create_user(&state, "admin@example.com", &[Role::Admin]).await?;

    // Eight participants race for three seats.
    let workshop_id = common::create_workshop(&state, &admin, None, 0, Some(3)).await?;
    let cycle_id =
        common::create_cycle(&state, &admin, workshop_id, Utc::now() + Duration::days(5), None)
            .await?;

    let mut participants = Vec::new();
    for i in 0..8 {
        let email = format!("racer{i}@example.com");
        participants.push(common::create_user(&state, &email, &[Role::Participant]).await?);
    }

    let mut handles = Vec::new();
    for participant in participants {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            enrollment_service::enroll(&state, &participant, EnrollRequest { cycle_id }).await
        }));
    }
    let (mut enrolled, mut turned_away) = (0, 0);
    for handle in handles {
        match handle.await? {
            Ok(_) => enrolled += 1,
            Err(AppError::Conflict(_)) => turned_away += 1,
            Err(other) => return Err(other.into()),
        }
    }
    assert_eq!((enrolled, turned_away), (3, 5));

    let roster = enrollment_service::cycle_participants(&state, &admin, cycle_id)
        .await?
        .data
        .expect("participants");
    assert_eq!(roster.availability.active, 3);
    assert_eq!(roster.availability.seats_left, Some(0));

    // One participant submits the same review eight times at once.
    let reviewed = common::create_workshop(&state, &admin, None, 0, None).await?;
    let ongoing = common::create_cycle(
        &state,
        &admin,
        reviewed,
        Utc::now() - Duration::days(1),
        Some(Utc::now() + Duration::days(1)),
    )
    .await?;
    let gina = common::create_user(&state, "gina@example.com", &[Role::Participant]).await?;
    enrollment_service::enroll(&state, &gina, EnrollRequest { cycle_id: ongoing }).await?;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let state = state.clone();
        let gina = gina.clone();
        handles.push(tokio::spawn(async move {
            review_service::create_review(
                &state,
                &gina,
                CreateReviewRequest {
                    workshop_id: reviewed,
                    rating: 5,
                    comment: "Great".into(),
                },
            )
            .await
        }));
    }
    let (mut created, mut duplicates) = (0, 0);
    for handle in handles {
        match handle.await? {
            Ok(_) => created += 1,
            Err(AppError::Conflict(_)) => duplicates += 1,
            Err(other) => return Err(other.into()),
        }
    }
    assert_eq!((created, duplicates), (1, 7));
    let stored = review_service::list_reviews(&state, reviewed, Pagination::default()).await?;
    assert_eq!(stored.meta.and_then(|m| m.total), Some(1));

    // Different participants reviewing at once all land in the average.
    let mut handles = Vec::new();
    for (i, rating) in [1_i16, 2, 3].into_iter().enumerate() {
        let email = format!("critic{i}@example.com");
        let critic = common::create_user(&state, &email, &[Role::Participant]).await?;
        enrollment_service::enroll(&state, &critic, EnrollRequest { cycle_id: ongoing }).await?;
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            review_service::create_review(
                &state,
                &critic,
                CreateReviewRequest {
                    workshop_id: reviewed,
                    rating,
                    comment: String::new(),
                },
            )
            .await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let details = workshop_service::get_workshop(&state, reviewed)
        .await?
        .data
        .expect("workshop");
    // (5 + 1 + 2 + 3) / 4
    assert!((details.workshop.average_rating - 2.75).abs() < 1e-9);

    Ok(())
}
