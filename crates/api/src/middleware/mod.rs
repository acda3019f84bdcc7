//! HTTP middleware stack for the API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. CORS (storefront client origin, credentials allowed)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)

pub mod auth;
pub mod session;

pub use auth::{
    AuthRejection, OptionalUser, RequireAdmin, RequireUser, clear_current_user, set_current_user,
};
pub use session::create_session_layer;
