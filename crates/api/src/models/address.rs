//! Address row and request types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marigold_core::{AddressId, UserId};

/// A saved shipping address.
///
/// Addresses belong to a user; at most one per user carries
/// `is_default` (enforced by a partial unique index and the
/// reset-then-set write path). Orders reference addresses by bare id
/// with no foreign key, so deleting an address leaves historical orders
/// pointing at nothing - order reads resolve that to `null`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    #[serde(skip_serializing)]
    pub user_id: UserId,
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating or replacing an address.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressForm {
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}
