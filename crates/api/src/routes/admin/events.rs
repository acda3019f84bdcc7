//! Admin event management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use marigold_core::EventId;

use crate::db;
use crate::error::{ApiError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Event, EventForm, EventPatch, Subscription};
use crate::state::AppState;

/// GET /api/admin/events
///
/// All events, inactive ones included.
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn list(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<Event>>> {
    let events = db::events::list_all(state.pool()).await?;

    Ok(Json(events))
}

/// POST /api/admin/events
///
/// # Errors
///
/// Returns 400 for an empty title.
pub async fn create(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(form): Json<EventForm>,
) -> Result<(StatusCode, Json<Event>)> {
    if form.title.trim().is_empty() {
        return Err(ApiError::InvalidRequest("title is required".to_owned()));
    }

    let event = db::events::create(state.pool(), &form).await?;

    tracing::info!(event_id = %event.id, "event created");

    Ok((StatusCode::CREATED, Json(event)))
}

/// PUT /api/admin/events/{id}
///
/// # Errors
///
/// Returns 404 for unknown events.
pub async fn update(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<EventId>,
    Json(patch): Json<EventPatch>,
) -> Result<Json<Event>> {
    let event = db::events::update(state.pool(), id, &patch).await?;

    Ok(Json(event))
}

/// PUT /api/admin/events/{id}/toggle
///
/// # Errors
///
/// Returns 404 for unknown events.
pub async fn toggle(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<EventId>,
) -> Result<Json<Event>> {
    let event = db::events::toggle(state.pool(), id).await?;

    Ok(Json(event))
}

/// DELETE /api/admin/events/{id}
///
/// Subscriptions and reminder-ledger rows go with the event.
///
/// # Errors
///
/// Returns 404 for unknown events.
pub async fn delete(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<EventId>,
) -> Result<StatusCode> {
    db::events::delete(state.pool(), id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/events/{id}/subscribers
///
/// Per-event subscriptions only; global subscribers are not listed
/// here.
///
/// # Errors
///
/// Returns 404 for unknown events.
pub async fn subscribers(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<EventId>,
) -> Result<Json<Vec<Subscription>>> {
    db::events::get(state.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event"))?;

    let subscribers = db::events::subscribers_for_event(state.pool(), id).await?;

    Ok(Json(subscribers))
}
