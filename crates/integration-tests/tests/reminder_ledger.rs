//! Integration tests for the event-reminder ledger.
//!
//! The hourly sweep claims (event, bucket, recipient) rows before
//! sending, so a doubled run, a restarted process, or two instances
//! racing can never mail the same reminder twice. Requires a live
//! Postgres database; see `order_workflow.rs` for run instructions.

use chrono::{Duration, Utc};
use marigold_api::db;
use marigold_core::ReminderBucket;
use marigold_integration_tests::{create_event, test_pool, unique_email};

// ============================================================================
// Claim idempotence
// ============================================================================

#[tokio::test]
#[ignore = "Requires a test database (set TEST_DATABASE_URL)"]
async fn a_reminder_claim_can_only_be_taken_once() {
    let pool = test_pool().await;
    let event = create_event(&pool, Utc::now() + Duration::hours(6)).await;
    let email = unique_email("claimant");
    let bucket = ReminderBucket::SixHours.label();

    let first = db::events::claim_reminder(&pool, event.id, bucket, &email)
        .await
        .expect("Failed to claim");
    assert!(first);

    // A doubled sweep loses the race against its own earlier run.
    let second = db::events::claim_reminder(&pool, event.id, bucket, &email)
        .await
        .expect("Failed to claim");
    assert!(!second);
}

#[tokio::test]
#[ignore = "Requires a test database (set TEST_DATABASE_URL)"]
async fn releasing_a_claim_allows_a_retry() {
    let pool = test_pool().await;
    let event = create_event(&pool, Utc::now() + Duration::days(1)).await;
    let email = unique_email("retrier");
    let bucket = ReminderBucket::OneDay.label();

    assert!(
        db::events::claim_reminder(&pool, event.id, bucket, &email)
            .await
            .expect("Failed to claim")
    );

    // A failed send gives the claim back.
    db::events::release_reminder(&pool, event.id, bucket, &email)
        .await
        .expect("Failed to release");

    assert!(
        db::events::claim_reminder(&pool, event.id, bucket, &email)
            .await
            .expect("Failed to reclaim")
    );
}

#[tokio::test]
#[ignore = "Requires a test database (set TEST_DATABASE_URL)"]
async fn buckets_are_claimed_independently() {
    let pool = test_pool().await;
    let event = create_event(&pool, Utc::now() + Duration::days(3)).await;
    let email = unique_email("regular");

    // The same recipient hears once per bucket, not once per event.
    assert!(
        db::events::claim_reminder(&pool, event.id, ReminderBucket::ThreeDays.label(), &email)
            .await
            .expect("Failed to claim")
    );
    assert!(
        db::events::claim_reminder(&pool, event.id, ReminderBucket::OneDay.label(), &email)
            .await
            .expect("Failed to claim")
    );
    assert!(
        !db::events::claim_reminder(&pool, event.id, ReminderBucket::ThreeDays.label(), &email)
            .await
            .expect("Failed to claim")
    );
}

// ============================================================================
// Recipient resolution
// ============================================================================

#[tokio::test]
#[ignore = "Requires a test database (set TEST_DATABASE_URL)"]
async fn recipients_merge_event_and_global_subscribers_without_duplicates() {
    let pool = test_pool().await;
    let event = create_event(&pool, Utc::now() + Duration::days(2)).await;

    let both = unique_email("both");
    let event_only = unique_email("event-only");
    let global_only = unique_email("global-only");

    db::events::subscribe(&pool, Some(event.id), &both)
        .await
        .expect("subscribe both/event");
    db::events::subscribe(&pool, None, &both)
        .await
        .expect("subscribe both/global");
    db::events::subscribe(&pool, Some(event.id), &event_only)
        .await
        .expect("subscribe event-only");
    db::events::subscribe(&pool, None, &global_only)
        .await
        .expect("subscribe global-only");

    let recipients = db::events::reminder_recipients(&pool, event.id)
        .await
        .expect("Failed to resolve recipients");

    let ours: Vec<_> = recipients
        .iter()
        .filter(|r| [&both, &event_only, &global_only].contains(r))
        .collect();
    assert_eq!(ours.len(), 3, "each address appears exactly once");
}

#[tokio::test]
#[ignore = "Requires a test database (set TEST_DATABASE_URL)"]
async fn duplicate_subscriptions_conflict() {
    let pool = test_pool().await;
    let event = create_event(&pool, Utc::now() + Duration::days(5)).await;
    let email = unique_email("eager");

    db::events::subscribe(&pool, Some(event.id), &email)
        .await
        .expect("first subscribe");

    let err = db::events::subscribe(&pool, Some(event.id), &email)
        .await
        .expect_err("second subscribe must conflict");
    assert!(matches!(
        err,
        marigold_api::db::RepositoryError::Conflict(_)
    ));

    // Deleting the event takes subscriptions and ledger rows with it.
    db::events::claim_reminder(&pool, event.id, ReminderBucket::OneWeek.label(), &email)
        .await
        .expect("Failed to claim");
    db::events::delete(&pool, event.id)
        .await
        .expect("Failed to delete event");

    let (subs,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM event_subscriptions WHERE event_id = $1")
            .bind(event.id)
            .fetch_one(&pool)
            .await
            .expect("count subs");
    assert_eq!(subs, 0);

    let (claims,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM event_reminder_log WHERE event_id = $1")
            .bind(event.id)
            .fetch_one(&pool)
            .await
            .expect("count claims");
    assert_eq!(claims, 0);
}
