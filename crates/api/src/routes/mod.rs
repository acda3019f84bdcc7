//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST   /api/auth/register          - Create an account + session
//! POST   /api/auth/login             - Start a session
//! POST   /api/auth/logout            - Flush the session
//! GET    /api/auth/me                - Current profile
//! PUT    /api/auth/profile           - Update name / password
//!
//! # Addresses (auth)
//! GET    /api/addresses              - List own addresses
//! POST   /api/addresses              - Add an address
//! PUT    /api/addresses/{id}         - Update an address
//! DELETE /api/addresses/{id}         - Remove an address
//! PUT    /api/addresses/{id}/default - Make an address the default
//!
//! # Cart (auth)
//! GET    /api/cart                   - Current cart with live prices
//! POST   /api/cart                   - Add a product (qty merges)
//! PUT    /api/cart/{productId}       - Set a line's quantity
//! DELETE /api/cart/{productId}       - Remove a line
//! DELETE /api/cart                   - Clear the cart
//!
//! # Catalog (public)
//! GET    /api/products               - Active products (?category, ?tag)
//! GET    /api/products/featured      - Featured products
//! GET    /api/products/{id}          - Product detail
//! GET    /api/categories             - Active categories
//!
//! # Orders (auth)
//! POST   /api/orders                 - Place an order
//! GET    /api/orders                 - Own order history
//! GET    /api/orders/{id}            - Order detail (owner or admin)
//! PUT    /api/orders/{id}/cancel     - Cancel within the window
//!
//! # Payments
//! POST   /api/payments/order         - Open a gateway order (auth)
//! POST   /api/payments/verify        - Verify a checkout callback (auth)
//! POST   /api/payments/webhook       - Gateway webhook (signature auth)
//!
//! # Events (public)
//! GET    /api/events                 - Active events, soonest first
//! GET    /api/events/{id}            - Event detail
//! POST   /api/events/{id}/subscribe  - Subscribe to one event
//! POST   /api/events/subscribe-all   - Subscribe to all events
//! DELETE /api/events/{id}/subscribe  - Unsubscribe from one event
//! DELETE /api/events/subscribe-all   - Drop the global subscription
//!
//! # Admin (admin session) - see [`admin`]
//! /api/admin/products, /api/admin/categories, /api/admin/events,
//! /api/admin/orders, /api/admin/users, /api/admin/stats,
//! /api/admin/newsletter
//! ```

pub mod addresses;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod events;
pub mod orders;
pub mod payments;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/profile", put(auth::update_profile))
}

/// Create the address routes router.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(addresses::list).post(addresses::create))
        .route(
            "/{id}",
            put(addresses::update).delete(addresses::delete),
        )
        .route("/{id}/default", put(addresses::set_default))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::add_item).delete(cart::clear))
        .route(
            "/{product_id}",
            put(cart::set_qty).delete(cart::remove_item),
        )
}

/// Create the public product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::list_products))
        .route("/featured", get(catalog::featured_products))
        .route("/{id}", get(catalog::get_product))
}

/// Create the event routes router.
pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(events::list))
        .route(
            "/subscribe-all",
            post(events::subscribe_all).delete(events::unsubscribe_all),
        )
        .route("/{id}", get(events::get))
        .route(
            "/{id}/subscribe",
            post(events::subscribe).delete(events::unsubscribe),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::place).get(orders::list))
        .route("/{id}", get(orders::get))
        .route("/{id}/cancel", put(orders::cancel))
}

/// Create the payment routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/order", post(payments::create_order))
        .route("/verify", post(payments::verify))
        .route("/webhook", post(payments::webhook))
}

/// Create the full API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api/addresses", address_routes())
        .nest("/api/cart", cart_routes())
        .nest("/api/products", product_routes())
        .route("/api/categories", get(catalog::list_categories))
        .nest("/api/events", event_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/payments", payment_routes())
        .nest("/api/admin", admin::routes())
}
