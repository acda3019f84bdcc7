//! Integration test harness for Marigold.
//!
//! # Running Tests
//!
//! The database-backed tests are `#[ignore]`d by default. Point
//! `TEST_DATABASE_URL` at a throwaway Postgres database and run:
//!
//! ```bash
//! TEST_DATABASE_URL=postgres://localhost/marigold_test \
//!     cargo test -p marigold-integration-tests -- --ignored
//! ```
//!
//! Migrations are applied automatically on first connection. Tests
//! create their own users/products with unique emails and names, so
//! they can share a database and run repeatedly without cleanup.
//!
//! The HTTP smoke tests additionally need a running API server; they
//! read `API_BASE_URL` (default `http://localhost:4000`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use chrono::{DateTime, Utc};
use marigold_api::db;
use marigold_api::models::{Address, AddressForm, Event, EventForm, Product, ProductForm, User};
use marigold_core::{Email, OrderId, UserId};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Connect to the test database and bring its schema up to date.
///
/// # Panics
///
/// Panics when `TEST_DATABASE_URL` is unset or unreachable; the tests
/// that call this are `#[ignore]`d so a plain `cargo test` never hits
/// this path.
pub async fn test_pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must point at a test database");

    let pool = PgPool::connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("../api/migrations")
        .run(&pool)
        .await
        .expect("Failed to apply migrations");

    pool
}

/// A unique email so concurrent tests never collide on the users table.
pub fn unique_email(prefix: &str) -> Email {
    let tag = Uuid::new_v4().simple();
    Email::parse(&format!("{prefix}-{tag}@test.invalid")).expect("generated email is valid")
}

/// Insert a fresh (non-admin) user. The password hash is a placeholder;
/// database-level tests never log in.
pub async fn create_user(pool: &PgPool, name: &str) -> User {
    let email = unique_email("user");
    db::users::create(pool, name, &email, "not-a-real-hash")
        .await
        .expect("Failed to create test user")
}

/// Insert an active product at the given price.
pub async fn create_product(pool: &PgPool, name: &str, price: Decimal) -> Product {
    let tag = Uuid::new_v4().simple();
    let form = ProductForm {
        name: format!("{name} {tag}"),
        description: "test product".to_owned(),
        price,
        images: Vec::new(),
        category_id: None,
        tags: Vec::new(),
        quantity: 10,
        is_active: true,
        is_featured: false,
    };
    db::products::create(pool, &form)
        .await
        .expect("Failed to create test product")
}

/// A filled-in address form. `is_default` is false; the repository
/// promotes a user's first address on its own.
pub fn address_form(full_name: &str) -> AddressForm {
    AddressForm {
        full_name: full_name.to_owned(),
        phone: "+1 555 0100".to_owned(),
        line1: "1 Test Lane".to_owned(),
        line2: None,
        city: "Springfield".to_owned(),
        state: "OR".to_owned(),
        postal_code: "97477".to_owned(),
        country: "US".to_owned(),
        is_default: false,
    }
}

/// Insert an address for the user and return it.
pub async fn create_address(pool: &PgPool, user_id: UserId) -> Address {
    db::addresses::create(pool, user_id, &address_form("Test Recipient"))
        .await
        .expect("Failed to create test address")
}

/// Insert an active event starting at the given instant.
pub async fn create_event(pool: &PgPool, start_time: DateTime<Utc>) -> Event {
    let tag = Uuid::new_v4().simple();
    let form = EventForm {
        title: format!("Test Event {tag}"),
        description: "integration test event".to_owned(),
        location: "Test Hall".to_owned(),
        start_time,
        end_time: None,
        image_url: None,
        is_active: true,
    };
    db::events::create(pool, &form)
        .await
        .expect("Failed to create test event")
}

/// Backdate an order so cancellation-window tests don't have to wait.
pub async fn backdate_order(pool: &PgPool, order_id: OrderId, hours: i32) {
    sqlx::query("UPDATE orders SET created_at = NOW() - $2 * INTERVAL '1 hour' WHERE id = $1")
        .bind(order_id)
        .bind(hours)
        .execute(pool)
        .await
        .expect("Failed to backdate order");
}
