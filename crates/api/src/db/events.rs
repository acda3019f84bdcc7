//! Database operations for events, reminder subscriptions and the
//! reminder ledger.
//!
//! The ledger (`event_reminder_log`) is what makes the hourly sweep
//! idempotent: a reminder is sent only by whoever wins the claim insert
//! for `(event, bucket, email)`. A failed send releases the claim so the
//! next sweep retries.

use sqlx::PgPool;

use marigold_core::{Email, EventId};

use super::RepositoryError;
use crate::models::{Event, EventForm, EventPatch, Subscription};

/// Active events, soonest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_active(pool: &PgPool) -> Result<Vec<Event>, RepositoryError> {
    let events = sqlx::query_as::<_, Event>(
        r"
        SELECT id, title, description, location, start_time, end_time,
               image_url, is_active, created_at
        FROM events
        WHERE is_active = TRUE
        ORDER BY start_time
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(events)
}

/// Every event, active or not, soonest first (admin).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_all(pool: &PgPool) -> Result<Vec<Event>, RepositoryError> {
    let events = sqlx::query_as::<_, Event>(
        r"
        SELECT id, title, description, location, start_time, end_time,
               image_url, is_active, created_at
        FROM events
        ORDER BY start_time
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(events)
}

/// Get an event by id.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get(pool: &PgPool, id: EventId) -> Result<Option<Event>, RepositoryError> {
    let event = sqlx::query_as::<_, Event>(
        r"
        SELECT id, title, description, location, start_time, end_time,
               image_url, is_active, created_at
        FROM events
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(event)
}

/// Create an event.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn create(pool: &PgPool, form: &EventForm) -> Result<Event, RepositoryError> {
    let event = sqlx::query_as::<_, Event>(
        r"
        INSERT INTO events (title, description, location, start_time, end_time,
                            image_url, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, title, description, location, start_time, end_time,
                  image_url, is_active, created_at
        ",
    )
    .bind(&form.title)
    .bind(&form.description)
    .bind(&form.location)
    .bind(form.start_time)
    .bind(form.end_time)
    .bind(&form.image_url)
    .bind(form.is_active)
    .fetch_one(pool)
    .await?;

    Ok(event)
}

/// Partially update an event.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the event doesn't exist.
pub async fn update(
    pool: &PgPool,
    id: EventId,
    patch: &EventPatch,
) -> Result<Event, RepositoryError> {
    sqlx::query_as::<_, Event>(
        r"
        UPDATE events
        SET title = COALESCE($2, title),
            description = COALESCE($3, description),
            location = COALESCE($4, location),
            start_time = COALESCE($5, start_time),
            end_time = COALESCE($6, end_time),
            image_url = COALESCE($7, image_url),
            is_active = COALESCE($8, is_active)
        WHERE id = $1
        RETURNING id, title, description, location, start_time, end_time,
                  image_url, is_active, created_at
        ",
    )
    .bind(id)
    .bind(&patch.title)
    .bind(&patch.description)
    .bind(&patch.location)
    .bind(patch.start_time)
    .bind(patch.end_time)
    .bind(&patch.image_url)
    .bind(patch.is_active)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Flip an event's visibility.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the event doesn't exist.
pub async fn toggle(pool: &PgPool, id: EventId) -> Result<Event, RepositoryError> {
    sqlx::query_as::<_, Event>(
        r"
        UPDATE events
        SET is_active = NOT is_active
        WHERE id = $1
        RETURNING id, title, description, location, start_time, end_time,
                  image_url, is_active, created_at
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Delete an event. Subscriptions and ledger entries cascade.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the event doesn't exist.
pub async fn delete(pool: &PgPool, id: EventId) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}

/// Total events (dashboard stat).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count(pool: &PgPool) -> Result<i64, RepositoryError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Active events starting within the next `horizon_hours` hours, the
/// window the reminder sweep cares about.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn upcoming(pool: &PgPool, horizon_hours: i32) -> Result<Vec<Event>, RepositoryError> {
    let events = sqlx::query_as::<_, Event>(
        r"
        SELECT id, title, description, location, start_time, end_time,
               image_url, is_active, created_at
        FROM events
        WHERE is_active = TRUE
          AND start_time > NOW()
          AND start_time <= NOW() + MAKE_INTERVAL(hours => $1)
        ORDER BY start_time
        ",
    )
    .bind(horizon_hours)
    .fetch_all(pool)
    .await?;

    Ok(events)
}

/// Subscribe an email to one event, or to all events when `event_id`
/// is `None`.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the subscription already
/// exists.
pub async fn subscribe(
    pool: &PgPool,
    event_id: Option<EventId>,
    email: &Email,
) -> Result<Subscription, RepositoryError> {
    sqlx::query_as::<_, Subscription>(
        r"
        INSERT INTO event_subscriptions (event_id, email)
        VALUES ($1, $2)
        RETURNING id, event_id, email, created_at
        ",
    )
    .bind(event_id)
    .bind(email)
    .fetch_one(pool)
    .await
    .map_err(|e| RepositoryError::from_sqlx(e, "already subscribed"))
}

/// Remove a subscription.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if no matching subscription
/// exists.
pub async fn unsubscribe(
    pool: &PgPool,
    event_id: Option<EventId>,
    email: &Email,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        DELETE FROM event_subscriptions
        WHERE event_id IS NOT DISTINCT FROM $1 AND email = $2
        ",
    )
    .bind(event_id)
    .bind(email)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}

/// Subscriptions tied to one event (admin view; global rows excluded).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn subscribers_for_event(
    pool: &PgPool,
    event_id: EventId,
) -> Result<Vec<Subscription>, RepositoryError> {
    let subscriptions = sqlx::query_as::<_, Subscription>(
        r"
        SELECT id, event_id, email, created_at
        FROM event_subscriptions
        WHERE event_id = $1
        ORDER BY created_at
        ",
    )
    .bind(event_id)
    .fetch_all(pool)
    .await?;

    Ok(subscriptions)
}

/// Distinct addresses that should hear about an event: its own
/// subscribers plus every global subscriber.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn reminder_recipients(
    pool: &PgPool,
    event_id: EventId,
) -> Result<Vec<Email>, RepositoryError> {
    let rows: Vec<(Email,)> = sqlx::query_as(
        r"
        SELECT DISTINCT email
        FROM event_subscriptions
        WHERE event_id = $1 OR event_id IS NULL
        ORDER BY email
        ",
    )
    .bind(event_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(email,)| email).collect())
}

/// Claim the right to send one reminder. Returns `false` when another
/// sweep (or an earlier run of this one) already claimed it.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn claim_reminder(
    pool: &PgPool,
    event_id: EventId,
    bucket: &str,
    email: &Email,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        INSERT INTO event_reminder_log (event_id, bucket, email)
        VALUES ($1, $2, $3)
        ON CONFLICT DO NOTHING
        ",
    )
    .bind(event_id)
    .bind(bucket)
    .bind(email)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Give a claim back after a failed send so a later sweep can retry.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn release_reminder(
    pool: &PgPool,
    event_id: EventId,
    bucket: &str,
    email: &Email,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        DELETE FROM event_reminder_log
        WHERE event_id = $1 AND bucket = $2 AND email = $3
        ",
    )
    .bind(event_id)
    .bind(bucket)
    .bind(email)
    .execute(pool)
    .await?;

    Ok(())
}
