//! Public event and reminder-subscription routes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use marigold_core::{Email, EventId};

use crate::db;
use crate::error::{ApiError, Result};
use crate::models::{Event, Subscription};
use crate::state::AppState;

/// Request body carrying a subscriber address.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

fn parse_email(raw: &str) -> Result<Email> {
    Email::parse(raw).map_err(|_| ApiError::InvalidRequest("Invalid email address".to_owned()))
}

/// GET /api/events
///
/// Active events, soonest first.
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Event>>> {
    let events = db::events::list_active(state.pool()).await?;

    Ok(Json(events))
}

/// GET /api/events/{id}
///
/// # Errors
///
/// Returns 404 for unknown events.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<Json<Event>> {
    let event = db::events::get(state.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event"))?;

    Ok(Json(event))
}

/// POST /api/events/{id}/subscribe
///
/// Subscribes an address to one event's reminders and confirms by
/// mail (best effort).
///
/// # Errors
///
/// Returns 404 for unknown events, 400 for malformed addresses and 409
/// when the subscription already exists.
pub async fn subscribe(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
    Json(req): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<Subscription>)> {
    let email = parse_email(&req.email)?;

    let event = db::events::get(state.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event"))?;

    let subscription = db::events::subscribe(state.pool(), Some(event.id), &email).await?;

    if let Some(mailer) = state.mailer()
        && let Err(e) = mailer.send_subscription_confirmed(&email, &event).await
    {
        tracing::warn!(error = %e, event_id = %event.id, "failed to send subscription confirmation");
    }

    Ok((StatusCode::CREATED, Json(subscription)))
}

/// POST /api/events/subscribe-all
///
/// Subscribes an address to reminders for every event.
///
/// # Errors
///
/// Returns 400 for malformed addresses and 409 on duplicates.
pub async fn subscribe_all(
    State(state): State<AppState>,
    Json(req): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<Subscription>)> {
    let email = parse_email(&req.email)?;

    let subscription = db::events::subscribe(state.pool(), None, &email).await?;

    if let Some(mailer) = state.mailer()
        && let Err(e) = mailer.send_subscription_confirmed_all(&email).await
    {
        tracing::warn!(error = %e, "failed to send subscription confirmation");
    }

    Ok((StatusCode::CREATED, Json(subscription)))
}

/// DELETE /api/events/{id}/subscribe
///
/// # Errors
///
/// Returns 404 when no matching subscription exists.
pub async fn unsubscribe(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
    Json(req): Json<SubscribeRequest>,
) -> Result<StatusCode> {
    let email = parse_email(&req.email)?;

    db::events::unsubscribe(state.pool(), Some(id), &email).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/events/subscribe-all
///
/// # Errors
///
/// Returns 404 when no matching subscription exists.
pub async fn unsubscribe_all(
    State(state): State<AppState>,
    Json(req): Json<SubscribeRequest>,
) -> Result<StatusCode> {
    let email = parse_email(&req.email)?;

    db::events::unsubscribe(state.pool(), None, &email).await?;

    Ok(StatusCode::NO_CONTENT)
}
