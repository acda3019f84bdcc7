//! Admin API routes.
//!
//! Every handler takes the [`RequireAdmin`] extractor, so a
//! non-admin session gets 403 before any work happens.
//!
//! [`RequireAdmin`]: crate::middleware::RequireAdmin

pub mod categories;
pub mod events;
pub mod newsletter;
pub mod orders;
pub mod products;
pub mod stats;
pub mod users;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the admin router, nested under `/api/admin`.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Catalog
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            put(products::update).delete(products::delete),
        )
        .route("/products/{id}/featured", put(products::set_featured))
        .route(
            "/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/categories/{id}",
            put(categories::update).delete(categories::delete),
        )
        .route("/categories/{id}/toggle", put(categories::toggle))
        // Events
        .route("/events", get(events::list).post(events::create))
        .route("/events/{id}", put(events::update).delete(events::delete))
        .route("/events/{id}/toggle", put(events::toggle))
        .route("/events/{id}/subscribers", get(events::subscribers))
        // Orders
        .route("/orders", get(orders::list))
        .route("/orders/{id}", get(orders::get))
        .route("/orders/{id}/status", put(orders::update_status))
        // Users
        .route("/users", get(users::list))
        .route(
            "/users/{id}",
            get(users::get).put(users::update).delete(users::delete),
        )
        // Dashboard
        .route("/stats/summary", get(stats::summary))
        .route("/stats/revenue", get(stats::revenue))
        .route("/stats/top-products", get(stats::top_products))
        .route("/newsletter", post(newsletter::send))
}
