//! Integration tests for order placement, cancellation and admin
//! status transitions.
//!
//! These tests require a live Postgres database:
//!
//! ```bash
//! TEST_DATABASE_URL=postgres://localhost/marigold_test \
//!     cargo test -p marigold-integration-tests -- --ignored
//! ```

use marigold_api::db;
use marigold_api::models::CurrentUser;
use marigold_api::services::orders::{OrderError, OrderLineInput, OrderService};
use marigold_core::{CancelledBy, Email, OrderStatus, PaymentMethod, ProductId};
use marigold_integration_tests::{backdate_order, create_address, create_product, create_user, test_pool};
use rust_decimal::Decimal;

fn ops_email() -> Email {
    Email::parse("ops@test.invalid").expect("static email is valid")
}

fn line(product_id: ProductId, qty: i32) -> OrderLineInput {
    OrderLineInput { product_id, qty }
}

async fn cart_product_ids(pool: &sqlx::PgPool, user_id: marigold_core::UserId) -> Vec<ProductId> {
    db::carts::lines(pool, user_id)
        .await
        .expect("Failed to read cart")
        .into_iter()
        .map(|(summary, _qty)| summary.id)
        .collect()
}

// ============================================================================
// Placement
// ============================================================================

#[tokio::test]
#[ignore = "Requires a test database (set TEST_DATABASE_URL)"]
async fn placing_an_order_freezes_the_total_and_prunes_the_cart() {
    let pool = test_pool().await;
    let user = create_user(&pool, "Order Placer").await;
    let caller = CurrentUser::from(&user);
    let address = create_address(&pool, user.id).await;

    let a = create_product(&pool, "Product A", Decimal::new(10000, 2)).await;
    let b = create_product(&pool, "Product B", Decimal::new(5000, 2)).await;
    let c = create_product(&pool, "Product C", Decimal::new(999, 2)).await;

    // Cart holds all three; only A and B get ordered.
    db::carts::add_item(&pool, user.id, a.id, 2).await.expect("add a");
    db::carts::add_item(&pool, user.id, b.id, 1).await.expect("add b");
    db::carts::add_item(&pool, user.id, c.id, 4).await.expect("add c");

    let ops = ops_email();
    let service = OrderService::new(&pool, None, &ops);
    let (order, items, resolved) = service
        .place(
            &caller,
            &[line(a.id, 2), line(b.id, 1)],
            address.id,
            PaymentMethod::Cod,
        )
        .await
        .expect("Failed to place order");

    // 100.00 x 2 + 50.00 x 1
    assert_eq!(order.total_price, Decimal::new(25000, 2));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(items.len(), 2);
    assert_eq!(resolved.map(|r| r.id), Some(address.id));

    // Only the ordered lines left the cart.
    let remaining = cart_product_ids(&pool, user.id).await;
    assert_eq!(remaining, vec![c.id]);
}

#[tokio::test]
#[ignore = "Requires a test database (set TEST_DATABASE_URL)"]
async fn order_total_survives_a_later_price_change() {
    let pool = test_pool().await;
    let user = create_user(&pool, "Price Watcher").await;
    let caller = CurrentUser::from(&user);
    let address = create_address(&pool, user.id).await;
    let product = create_product(&pool, "Volatile", Decimal::new(2000, 2)).await;

    let ops = ops_email();
    let service = OrderService::new(&pool, None, &ops);
    let (order, _, _) = service
        .place(&caller, &[line(product.id, 3)], address.id, PaymentMethod::Cod)
        .await
        .expect("Failed to place order");

    // Double the catalog price after the fact.
    sqlx::query("UPDATE products SET price = price * 2 WHERE id = $1")
        .bind(product.id)
        .execute(&pool)
        .await
        .expect("Failed to reprice");

    let reread = db::orders::get(&pool, order.id)
        .await
        .expect("Failed to reread order")
        .expect("order exists");
    assert_eq!(reread.total_price, Decimal::new(6000, 2));

    let items = db::orders::items_for(&pool, order.id)
        .await
        .expect("Failed to load items");
    assert_eq!(items[0].unit_price, Decimal::new(2000, 2));
}

#[tokio::test]
#[ignore = "Requires a test database (set TEST_DATABASE_URL)"]
async fn pruning_an_already_ordered_product_again_changes_nothing() {
    let pool = test_pool().await;
    let user = create_user(&pool, "Repeat Buyer").await;
    let caller = CurrentUser::from(&user);
    let address = create_address(&pool, user.id).await;

    let a = create_product(&pool, "Restock", Decimal::new(1500, 2)).await;
    let keep = create_product(&pool, "Keeper", Decimal::new(500, 2)).await;

    db::carts::add_item(&pool, user.id, a.id, 1).await.expect("add a");
    db::carts::add_item(&pool, user.id, keep.id, 2).await.expect("add keep");

    let ops = ops_email();
    let service = OrderService::new(&pool, None, &ops);
    service
        .place(&caller, &[line(a.id, 1)], address.id, PaymentMethod::Cod)
        .await
        .expect("first order");

    let after_first = cart_product_ids(&pool, user.id).await;
    assert_eq!(after_first, vec![keep.id]);

    // Ordering the same product again prunes an id that's already gone.
    service
        .place(&caller, &[line(a.id, 1)], address.id, PaymentMethod::Cod)
        .await
        .expect("second order");

    let after_second = cart_product_ids(&pool, user.id).await;
    assert_eq!(after_second, after_first);
}

#[tokio::test]
#[ignore = "Requires a test database (set TEST_DATABASE_URL)"]
async fn unknown_product_id_fails_the_whole_placement() {
    let pool = test_pool().await;
    let user = create_user(&pool, "Ghost Shopper").await;
    let caller = CurrentUser::from(&user);
    let address = create_address(&pool, user.id).await;
    let real = create_product(&pool, "Real", Decimal::new(1000, 2)).await;

    let ops = ops_email();
    let service = OrderService::new(&pool, None, &ops);
    let err = service
        .place(
            &caller,
            &[line(real.id, 1), line(ProductId::from(i32::MAX), 1)],
            address.id,
            PaymentMethod::Cod,
        )
        .await
        .expect_err("placement should fail");

    assert!(matches!(err, OrderError::UnknownProduct(_)));

    // No partial order row was written.
    let orders = db::orders::list_for_user(&pool, user.id)
        .await
        .expect("Failed to list orders");
    assert!(orders.is_empty());
}

// ============================================================================
// Customer cancellation
// ============================================================================

#[tokio::test]
#[ignore = "Requires a test database (set TEST_DATABASE_URL)"]
async fn fresh_pending_order_cancels_with_attribution() {
    let pool = test_pool().await;
    let user = create_user(&pool, "Canceller").await;
    let caller = CurrentUser::from(&user);
    let address = create_address(&pool, user.id).await;
    let product = create_product(&pool, "Regretted", Decimal::new(4200, 2)).await;

    let ops = ops_email();
    let service = OrderService::new(&pool, None, &ops);
    let (order, _, _) = service
        .place(&caller, &[line(product.id, 1)], address.id, PaymentMethod::Cod)
        .await
        .expect("Failed to place order");

    let (cancelled, _, _) = service
        .cancel(&caller, order.id, Some("changed my mind"))
        .await
        .expect("Failed to cancel order");

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.cancelled_by, Some(CancelledBy::User));
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("changed my mind"));
    assert!(cancelled.cancelled_at.is_some());
}

#[tokio::test]
#[ignore = "Requires a test database (set TEST_DATABASE_URL)"]
async fn cancellation_window_closes_after_24_hours() {
    let pool = test_pool().await;
    let user = create_user(&pool, "Latecomer").await;
    let caller = CurrentUser::from(&user);
    let address = create_address(&pool, user.id).await;
    let product = create_product(&pool, "Stale", Decimal::new(100, 2)).await;

    let ops = ops_email();
    let service = OrderService::new(&pool, None, &ops);
    let (order, _, _) = service
        .place(&caller, &[line(product.id, 1)], address.id, PaymentMethod::Cod)
        .await
        .expect("Failed to place order");

    backdate_order(&pool, order.id, 25).await;

    let err = service
        .cancel(&caller, order.id, None)
        .await
        .expect_err("cancel should be refused");
    assert!(matches!(err, OrderError::WindowExpired));

    // Still pending: the refusal wrote nothing.
    let reread = db::orders::get(&pool, order.id)
        .await
        .expect("Failed to reread")
        .expect("order exists");
    assert_eq!(reread.status, OrderStatus::Pending);
}

#[tokio::test]
#[ignore = "Requires a test database (set TEST_DATABASE_URL)"]
async fn only_the_owner_may_cancel() {
    let pool = test_pool().await;
    let owner = create_user(&pool, "Owner").await;
    let stranger = create_user(&pool, "Stranger").await;
    let address = create_address(&pool, owner.id).await;
    let product = create_product(&pool, "Private", Decimal::new(700, 2)).await;

    let ops = ops_email();
    let service = OrderService::new(&pool, None, &ops);
    let (order, _, _) = service
        .place(
            &CurrentUser::from(&owner),
            &[line(product.id, 1)],
            address.id,
            PaymentMethod::Cod,
        )
        .await
        .expect("Failed to place order");

    let err = service
        .cancel(&CurrentUser::from(&stranger), order.id, None)
        .await
        .expect_err("stranger must be refused");
    assert!(matches!(err, OrderError::NotOwner));
}

// ============================================================================
// Admin transitions
// ============================================================================

#[tokio::test]
#[ignore = "Requires a test database (set TEST_DATABASE_URL)"]
async fn admin_cancellation_records_actor_and_reason() {
    let pool = test_pool().await;
    let user = create_user(&pool, "Customer").await;
    let caller = CurrentUser::from(&user);
    let address = create_address(&pool, user.id).await;
    let product = create_product(&pool, "Unavailable", Decimal::new(3300, 2)).await;

    let ops = ops_email();
    let service = OrderService::new(&pool, None, &ops);
    let (order, _, _) = service
        .place(&caller, &[line(product.id, 1)], address.id, PaymentMethod::Cod)
        .await
        .expect("Failed to place order");

    let cancelled = service
        .transition(order.id, OrderStatus::Cancelled, Some("out of stock"))
        .await
        .expect("Failed to transition");

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.cancelled_by, Some(CancelledBy::Admin));
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("out of stock"));
}

#[tokio::test]
#[ignore = "Requires a test database (set TEST_DATABASE_URL)"]
async fn terminal_orders_refuse_further_transitions() {
    let pool = test_pool().await;
    let user = create_user(&pool, "Done Customer").await;
    let caller = CurrentUser::from(&user);
    let address = create_address(&pool, user.id).await;
    let product = create_product(&pool, "Delivered Goods", Decimal::new(8800, 2)).await;

    let ops = ops_email();
    let service = OrderService::new(&pool, None, &ops);
    let (order, _, _) = service
        .place(&caller, &[line(product.id, 1)], address.id, PaymentMethod::Cod)
        .await
        .expect("Failed to place order");

    service
        .transition(order.id, OrderStatus::Delivered, None)
        .await
        .expect("pending -> delivered is legal");

    let err = service
        .transition(order.id, OrderStatus::Processing, None)
        .await
        .expect_err("delivered is terminal");
    assert!(matches!(
        err,
        OrderError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Processing,
        }
    ));

    // Delivered orders are also past customer cancellation.
    let err = service
        .cancel(&caller, order.id, None)
        .await
        .expect_err("cancel must be refused");
    assert!(matches!(err, OrderError::NotPending));
}
