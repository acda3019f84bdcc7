//! Database operations for orders.
//!
//! Placement is one transaction: insert the order row, snapshot the
//! line items, prune the ordered products from the cart. Either all of
//! it lands or none of it does, so a failed placement never half-empties
//! a cart.
//!
//! Status changes use guarded updates (`WHERE status = ...`) so two
//! concurrent writers can't both move the same order; the loser sees
//! zero rows and gets a conflict.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use marigold_core::{CancelledBy, OrderId, OrderStatus, ProductId, UserId};

use super::RepositoryError;
use crate::models::{NewOrder, Order, OrderItem};

/// Place an order: write the row, snapshot its items and prune exactly
/// the ordered products from the cart, all in one transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any statement fails; the
/// transaction rolls back.
pub async fn create(pool: &PgPool, new_order: &NewOrder) -> Result<Order, RepositoryError> {
    let mut tx = pool.begin().await?;

    let is_paid = new_order.payment_method.settles_at_placement();

    let order = sqlx::query_as::<_, Order>(
        r"
        INSERT INTO orders (user_id, address_id, total_price, payment_method, is_paid, paid_at)
        VALUES ($1, $2, $3, $4, $5, CASE WHEN $5 THEN NOW() END)
        RETURNING id, user_id, address_id, total_price, payment_method, is_paid,
                  paid_at, gateway_order_id, status, cancelled_by,
                  cancellation_reason, cancelled_at, created_at, updated_at
        ",
    )
    .bind(new_order.user_id)
    .bind(new_order.address_id)
    .bind(new_order.total)
    .bind(new_order.payment_method)
    .bind(is_paid)
    .fetch_one(&mut *tx)
    .await?;

    for line in &new_order.lines {
        sqlx::query(
            r"
            INSERT INTO order_items (order_id, product_id, product_name, unit_price, qty)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(order.id)
        .bind(line.product_id)
        .bind(&line.name)
        .bind(line.unit_price)
        .bind(line.qty)
        .execute(&mut *tx)
        .await?;
    }

    let ordered_ids: Vec<i32> = new_order
        .lines
        .iter()
        .map(|line| i32::from(line.product_id))
        .collect();

    sqlx::query(
        r"
        DELETE FROM cart_items ci
        USING carts c
        WHERE ci.cart_id = c.id AND c.user_id = $1 AND ci.product_id = ANY($2)
        ",
    )
    .bind(new_order.user_id)
    .bind(ordered_ids)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(order)
}

/// Get an order by id.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get(pool: &PgPool, id: OrderId) -> Result<Option<Order>, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(
        r"
        SELECT id, user_id, address_id, total_price, payment_method, is_paid,
               paid_at, gateway_order_id, status, cancelled_by,
               cancellation_reason, cancelled_at, created_at, updated_at
        FROM orders
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(order)
}

/// A user's orders, newest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_for_user(pool: &PgPool, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
    let orders = sqlx::query_as::<_, Order>(
        r"
        SELECT id, user_id, address_id, total_price, payment_method, is_paid,
               paid_at, gateway_order_id, status, cancelled_by,
               cancellation_reason, cancelled_at, created_at, updated_at
        FROM orders
        WHERE user_id = $1
        ORDER BY created_at DESC
        ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(orders)
}

/// Every order, newest first (admin).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_all(pool: &PgPool) -> Result<Vec<Order>, RepositoryError> {
    let orders = sqlx::query_as::<_, Order>(
        r"
        SELECT id, user_id, address_id, total_price, payment_method, is_paid,
               paid_at, gateway_order_id, status, cancelled_by,
               cancellation_reason, cancelled_at, created_at, updated_at
        FROM orders
        ORDER BY created_at DESC
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(orders)
}

/// Line items for one order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn items_for(pool: &PgPool, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
    let items = sqlx::query_as::<_, OrderItem>(
        r"
        SELECT id, order_id, product_id, product_name, unit_price, qty
        FROM order_items
        WHERE order_id = $1
        ORDER BY id
        ",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    Ok(items)
}

/// Line items for a batch of orders, grouped by `order_id` in the
/// result order. One query instead of one per order when listing.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn items_for_many(
    pool: &PgPool,
    order_ids: &[OrderId],
) -> Result<Vec<OrderItem>, RepositoryError> {
    let raw_ids: Vec<i32> = order_ids.iter().copied().map(i32::from).collect();

    let items = sqlx::query_as::<_, OrderItem>(
        r"
        SELECT id, order_id, product_id, product_name, unit_price, qty
        FROM order_items
        WHERE order_id = ANY($1)
        ORDER BY order_id, id
        ",
    )
    .bind(raw_ids)
    .fetch_all(pool)
    .await?;

    Ok(items)
}

/// Cancel a pending order.
///
/// The `status = 'pending'` guard makes this safe against a concurrent
/// transition; the caller has already validated ownership and the
/// cancellation window.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the order stopped being
/// pending between the caller's check and this update.
pub async fn cancel(
    pool: &PgPool,
    id: OrderId,
    cancelled_by: CancelledBy,
    reason: Option<&str>,
) -> Result<Order, RepositoryError> {
    sqlx::query_as::<_, Order>(
        r"
        UPDATE orders
        SET status = 'cancelled',
            cancelled_by = $2,
            cancellation_reason = $3,
            cancelled_at = NOW(),
            updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        RETURNING id, user_id, address_id, total_price, payment_method, is_paid,
                  paid_at, gateway_order_id, status, cancelled_by,
                  cancellation_reason, cancelled_at, created_at, updated_at
        ",
    )
    .bind(id)
    .bind(cancelled_by)
    .bind(reason)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| RepositoryError::Conflict("Only pending orders can be cancelled".to_owned()))
}

/// Move an order from one status to another.
///
/// The caller decides whether `from -> to` is a legal transition; the
/// `status = from` guard only protects against races. Transitions to
/// `cancelled` record the admin as the canceller.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the order is no longer in
/// `from`.
pub async fn update_status(
    pool: &PgPool,
    id: OrderId,
    from: OrderStatus,
    to: OrderStatus,
    reason: Option<&str>,
) -> Result<Order, RepositoryError> {
    sqlx::query_as::<_, Order>(
        r"
        UPDATE orders
        SET status = $3,
            cancelled_by = CASE WHEN $3 = 'cancelled'::order_status
                                THEN 'admin'::order_actor ELSE cancelled_by END,
            cancellation_reason = CASE WHEN $3 = 'cancelled'::order_status
                                       THEN $4 ELSE cancellation_reason END,
            cancelled_at = CASE WHEN $3 = 'cancelled'::order_status
                                THEN NOW() ELSE cancelled_at END,
            updated_at = NOW()
        WHERE id = $1 AND status = $2
        RETURNING id, user_id, address_id, total_price, payment_method, is_paid,
                  paid_at, gateway_order_id, status, cancelled_by,
                  cancellation_reason, cancelled_at, created_at, updated_at
        ",
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(reason)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| RepositoryError::Conflict("order status changed concurrently".to_owned()))
}

/// Remember the gateway order opened for an online payment.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order doesn't exist.
pub async fn set_gateway_order(
    pool: &PgPool,
    id: OrderId,
    gateway_order_id: &str,
) -> Result<Order, RepositoryError> {
    sqlx::query_as::<_, Order>(
        r"
        UPDATE orders
        SET gateway_order_id = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING id, user_id, address_id, total_price, payment_method, is_paid,
                  paid_at, gateway_order_id, status, cancelled_by,
                  cancellation_reason, cancelled_at, created_at, updated_at
        ",
    )
    .bind(id)
    .bind(gateway_order_id)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Mark an order paid. Idempotent: an already-paid order keeps its
/// original `paid_at`.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order doesn't exist.
pub async fn mark_paid(pool: &PgPool, id: OrderId) -> Result<Order, RepositoryError> {
    sqlx::query_as::<_, Order>(
        r"
        UPDATE orders
        SET is_paid = TRUE, paid_at = COALESCE(paid_at, NOW()), updated_at = NOW()
        WHERE id = $1
        RETURNING id, user_id, address_id, total_price, payment_method, is_paid,
                  paid_at, gateway_order_id, status, cancelled_by,
                  cancellation_reason, cancelled_at, created_at, updated_at
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Mark the order tied to a gateway order paid (webhook path). Returns
/// `None` when no order references that gateway id.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn mark_paid_by_gateway(
    pool: &PgPool,
    gateway_order_id: &str,
) -> Result<Option<Order>, RepositoryError> {
    let order = sqlx::query_as::<_, Order>(
        r"
        UPDATE orders
        SET is_paid = TRUE, paid_at = COALESCE(paid_at, NOW()), updated_at = NOW()
        WHERE gateway_order_id = $1
        RETURNING id, user_id, address_id, total_price, payment_method, is_paid,
                  paid_at, gateway_order_id, status, cancelled_by,
                  cancellation_reason, cancelled_at, created_at, updated_at
        ",
    )
    .bind(gateway_order_id)
    .fetch_optional(pool)
    .await?;

    Ok(order)
}

/// Total orders (dashboard stat).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count(pool: &PgPool) -> Result<i64, RepositoryError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Orders still awaiting fulfilment (dashboard stat).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn pending_count(pool: &PgPool) -> Result<i64, RepositoryError> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM orders WHERE status = 'pending'")
            .fetch_one(pool)
            .await?;

    Ok(count)
}

/// Revenue booked so far: every paid, non-cancelled order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn total_revenue(pool: &PgPool) -> Result<Decimal, RepositoryError> {
    let (total,): (Decimal,) = sqlx::query_as(
        r"
        SELECT COALESCE(SUM(total_price), 0)
        FROM orders
        WHERE is_paid = TRUE AND status <> 'cancelled'
        ",
    )
    .fetch_one(pool)
    .await?;

    Ok(total)
}

/// Revenue for one calendar month of paid orders.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: Decimal,
    pub orders: i64,
}

/// Aggregate revenue over paid orders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueStats {
    pub total_revenue: Decimal,
    pub avg_order_value: Decimal,
    pub revenue_by_month: Vec<MonthlyRevenue>,
}

/// Revenue stats over paid, non-cancelled orders, bucketed by the
/// month they were paid. The series covers the last 12 calendar
/// months.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn revenue_stats(pool: &PgPool) -> Result<RevenueStats, RepositoryError> {
    let (total_revenue, paid_orders): (Decimal, i64) = sqlx::query_as(
        r"
        SELECT COALESCE(SUM(total_price), 0), COUNT(*)
        FROM orders
        WHERE is_paid = TRUE AND status <> 'cancelled'
        ",
    )
    .fetch_one(pool)
    .await?;

    let revenue_by_month = sqlx::query_as::<_, MonthlyRevenue>(
        r"
        SELECT TO_CHAR(DATE_TRUNC('month', paid_at), 'Mon YYYY') AS month,
               SUM(total_price) AS revenue,
               COUNT(*)::BIGINT AS orders
        FROM orders
        WHERE is_paid = TRUE
          AND status <> 'cancelled'
          AND paid_at >= DATE_TRUNC('month', NOW()) - INTERVAL '11 months'
        GROUP BY DATE_TRUNC('month', paid_at)
        ORDER BY DATE_TRUNC('month', paid_at)
        ",
    )
    .fetch_all(pool)
    .await?;

    let avg_order_value = if paid_orders == 0 {
        Decimal::ZERO
    } else {
        total_revenue / Decimal::from(paid_orders)
    };

    Ok(RevenueStats {
        total_revenue,
        avg_order_value,
        revenue_by_month,
    })
}

/// A best-selling product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub price: Decimal,
    pub qty_sold: i64,
}

/// The five best-selling products by quantity across non-cancelled
/// orders.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn top_products(pool: &PgPool) -> Result<Vec<TopProduct>, RepositoryError> {
    let products = sqlx::query_as::<_, TopProduct>(
        r"
        SELECT p.id AS product_id,
               p.name,
               p.images[1] AS image,
               p.price,
               SUM(oi.qty)::BIGINT AS qty_sold
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id AND o.status <> 'cancelled'
        JOIN products p ON p.id = oi.product_id
        GROUP BY p.id, p.name, p.images, p.price
        ORDER BY qty_sold DESC
        LIMIT 5
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(products)
}
