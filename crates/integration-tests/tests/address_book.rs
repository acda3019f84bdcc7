//! Integration tests for the address book: the single-default invariant
//! and read-time address resolution on orders.
//!
//! Requires a live Postgres database; see `order_workflow.rs` for the
//! run instructions.

use marigold_api::db;
use marigold_api::models::CurrentUser;
use marigold_api::services::orders::{OrderLineInput, OrderService};
use marigold_core::{Email, PaymentMethod, UserId};
use marigold_integration_tests::{address_form, create_product, create_user, test_pool};
use rust_decimal::Decimal;
use sqlx::PgPool;

async fn default_count(pool: &PgPool, user_id: UserId) -> usize {
    db::addresses::list_for_user(pool, user_id)
        .await
        .expect("Failed to list addresses")
        .iter()
        .filter(|a| a.is_default)
        .count()
}

// ============================================================================
// Default uniqueness
// ============================================================================

#[tokio::test]
#[ignore = "Requires a test database (set TEST_DATABASE_URL)"]
async fn first_address_becomes_the_default() {
    let pool = test_pool().await;
    let user = create_user(&pool, "First Mover").await;

    // The form doesn't ask for default; the repository promotes it.
    let address = db::addresses::create(&pool, user.id, &address_form("Only One"))
        .await
        .expect("Failed to create address");

    assert!(address.is_default);
    assert_eq!(default_count(&pool, user.id).await, 1);
}

#[tokio::test]
#[ignore = "Requires a test database (set TEST_DATABASE_URL)"]
async fn any_sequence_of_changes_leaves_at_most_one_default() {
    let pool = test_pool().await;
    let user = create_user(&pool, "Mover").await;

    let home = db::addresses::create(&pool, user.id, &address_form("Home"))
        .await
        .expect("create home");

    let mut office_form = address_form("Office");
    office_form.is_default = true;
    let office = db::addresses::create(&pool, user.id, &office_form)
        .await
        .expect("create office");
    assert_eq!(default_count(&pool, user.id).await, 1);

    let cabin = db::addresses::create(&pool, user.id, &address_form("Cabin"))
        .await
        .expect("create cabin");
    assert_eq!(default_count(&pool, user.id).await, 1);

    db::addresses::set_default(&pool, user.id, cabin.id)
        .await
        .expect("default cabin");
    assert_eq!(default_count(&pool, user.id).await, 1);

    db::addresses::set_default(&pool, user.id, home.id)
        .await
        .expect("default home");
    assert_eq!(default_count(&pool, user.id).await, 1);

    let addresses = db::addresses::list_for_user(&pool, user.id)
        .await
        .expect("Failed to list addresses");
    let default = addresses.iter().find(|a| a.is_default).expect("one default");
    assert_eq!(default.id, home.id);
    assert!(!addresses.iter().any(|a| a.id == office.id && a.is_default));
}

#[tokio::test]
#[ignore = "Requires a test database (set TEST_DATABASE_URL)"]
async fn set_default_refuses_another_users_address() {
    let pool = test_pool().await;
    let alice = create_user(&pool, "Alice").await;
    let bob = create_user(&pool, "Bob").await;

    let alices = db::addresses::create(&pool, alice.id, &address_form("Alice Home"))
        .await
        .expect("create address");

    let err = db::addresses::set_default(&pool, bob.id, alices.id)
        .await
        .expect_err("cross-user set-default must fail");
    assert!(matches!(err, marigold_api::db::RepositoryError::NotFound));

    // Alice's default is untouched.
    assert_eq!(default_count(&pool, alice.id).await, 1);
}

// ============================================================================
// Read-time resolution on orders
// ============================================================================

#[tokio::test]
#[ignore = "Requires a test database (set TEST_DATABASE_URL)"]
async fn deleted_address_resolves_to_none_on_an_old_order() {
    let pool = test_pool().await;
    let user = create_user(&pool, "Mover Outer").await;
    let caller = CurrentUser::from(&user);

    let address = db::addresses::create(&pool, user.id, &address_form("Old Flat"))
        .await
        .expect("create address");
    let product = create_product(&pool, "Keepsake", Decimal::new(1299, 2)).await;

    let ops = Email::parse("ops@test.invalid").expect("static email is valid");
    let service = OrderService::new(&pool, None, &ops);
    let (order, _, resolved) = service
        .place(
            &caller,
            &[OrderLineInput {
                product_id: product.id,
                qty: 1,
            }],
            address.id,
            PaymentMethod::Cod,
        )
        .await
        .expect("Failed to place order");
    assert!(resolved.is_some());

    db::addresses::delete(&pool, user.id, address.id)
        .await
        .expect("Failed to delete address");

    // The order row survives; resolution just comes back empty.
    let (items, resolved) = service
        .load_view_parts(&order)
        .await
        .expect("Failed to load view parts");
    assert_eq!(items.len(), 1);
    assert!(resolved.is_none());

    let direct = db::addresses::get(&pool, user.id, order.address_id)
        .await
        .expect("lookup should not error");
    assert!(direct.is_none());
}
