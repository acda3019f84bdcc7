//! Event and subscription row types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marigold_core::{Email, EventId, SubscriptionId};

/// A store event (workshop, pooja, sale).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A reminder subscription.
///
/// `event_id = None` is a global subscription: the address gets
/// reminders for every active event.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: SubscriptionId,
    pub event_id: Option<EventId>,
    pub email: Email,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating an event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventForm {
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Partial update for an event. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

const fn default_active() -> bool {
    true
}
