//! Postgres-backed session plumbing (tower-sessions).

use sqlx::PgPool;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::ApiConfig;

pub const SESSION_COOKIE_NAME: &str = "marigold_session";

/// Sessions lapse after a week without a request.
const SESSION_IDLE_DAYS: i64 = 7;

/// Build the session layer over the shared pool.
///
/// The backing `tower_sessions.session` table comes from our own
/// migrations, not the store's `migrate()`.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &ApiConfig,
) -> SessionManagerLayer<PostgresStore> {
    // Cookies are marked Secure exactly when the public URL is https.
    let https = config.base_url.starts_with("https://");

    SessionManagerLayer::new(PostgresStore::new(pool.clone()))
        .with_name(SESSION_COOKIE_NAME)
        .with_path("/")
        .with_http_only(true)
        .with_secure(https)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_IDLE_DAYS)))
}
