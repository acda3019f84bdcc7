//! Database operations for the Marigold `PostgreSQL` database.
//!
//! # Tables
//!
//! - `users` - Customer and admin accounts
//! - `addresses` - Saved shipping addresses (one default per user)
//! - `categories` / `products` - Catalog
//! - `carts` / `cart_items` - One cart per user, one line per product
//! - `orders` / `order_items` - Orders with price-snapshot line items
//! - `events` / `event_subscriptions` - Store events and reminder signups
//! - `event_reminder_log` - Idempotency ledger for the reminder sweep
//! - `tower_sessions.session` - Session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p marigold-cli -- migrate
//! ```
//!
//! All queries use the runtime query API (`sqlx::query_as::<_, T>`) with
//! `FromRow` row types, so the workspace builds without a live database.

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub mod addresses;
pub mod carts;
pub mod categories;
pub mod events;
pub mod orders;
pub mod products;
pub mod users;

/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a sqlx error, turning unique violations into `Conflict`.
    pub(crate) fn from_sqlx(err: sqlx::Error, conflict_message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(conflict_message.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
