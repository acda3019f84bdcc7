//! Order workflow: pricing, placement, cancellation and status
//! transitions.
//!
//! The decision logic lives in plain functions (`resolve_pricing`,
//! `check_cancellable`, `validate_transition`) so it can be tested
//! without a database; `OrderService` wires those decisions to the
//! repositories and the mailer.
//!
//! Notification direction follows who acted: customer actions (place,
//! cancel) alert the ops address, admin actions (status changes) mail
//! the customer. Mail is always best-effort; a failed send is logged
//! and never rolls back or fails the request.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use marigold_core::{
    AddressId, CancelledBy, Email, OrderId, OrderStatus, PaymentMethod, ProductId, UserId,
};

use crate::db::{self, RepositoryError};
use crate::models::{Address, CurrentUser, NewOrder, Order, OrderItem, PricedLine, Product};
use crate::services::email::EmailService;

/// How long after placement a customer may cancel, in hours.
pub const CANCELLATION_WINDOW_HOURS: i64 = 24;

/// Fallback reason recorded when a cancellation gives none.
pub const DEFAULT_CANCELLATION_REASON: &str = "No reason provided";

/// One requested order line.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineInput {
    pub product_id: ProductId,
    pub qty: i32,
}

/// Ways the order workflow can reject an operation.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No items in the request.
    #[error("Order must contain at least one item")]
    EmptyOrder,

    /// A line quantity below one.
    #[error("Item quantities must be at least 1")]
    InvalidQuantity,

    /// A requested product id with no catalog row at all.
    #[error("Product {0} is not available")]
    UnknownProduct(ProductId),

    /// No such order.
    #[error("Order not found")]
    NotFound,

    /// Caller doesn't own the order.
    #[error("You do not have access to this order")]
    NotOwner,

    /// Cancellation requires a pending order.
    #[error("Only pending orders can be cancelled")]
    NotPending,

    /// Cancellation window has closed.
    #[error("Cannot cancel after {CANCELLATION_WINDOW_HOURS} hours")]
    WindowExpired,

    /// The requested status change is not in the transition table.
    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Price a set of requested lines against the fetched catalog rows.
///
/// Every requested id must resolve to a row; an id with no row fails
/// the whole order rather than silently dropping the line. Soft-deleted
/// or inactive products still price, so a delisting between cart and
/// checkout doesn't strand the customer.
///
/// Returns the frozen lines and the authoritative total.
///
/// # Errors
///
/// Returns `OrderError::EmptyOrder`, `OrderError::InvalidQuantity` or
/// `OrderError::UnknownProduct` when the request can't be priced.
pub fn resolve_pricing(
    products: &[Product],
    requested: &[OrderLineInput],
) -> Result<(Vec<PricedLine>, Decimal), OrderError> {
    if requested.is_empty() {
        return Err(OrderError::EmptyOrder);
    }
    if requested.iter().any(|line| line.qty < 1) {
        return Err(OrderError::InvalidQuantity);
    }

    let by_id: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let mut lines = Vec::with_capacity(requested.len());
    let mut total = Decimal::ZERO;

    for line in requested {
        let product = by_id
            .get(&line.product_id)
            .ok_or(OrderError::UnknownProduct(line.product_id))?;

        let line_total = product.price * Decimal::from(line.qty);
        total += line_total;

        lines.push(PricedLine {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            qty: line.qty,
        });
    }

    Ok((lines, total))
}

/// Gate a customer cancellation. Guards run in a fixed order: ownership,
/// then status, then the 24 hour window, so the caller always gets the
/// most specific refusal.
///
/// # Errors
///
/// Returns `OrderError::NotOwner`, `OrderError::NotPending` or
/// `OrderError::WindowExpired` when the order may not be cancelled.
pub fn check_cancellable(
    order: &Order,
    caller: UserId,
    now: DateTime<Utc>,
) -> Result<(), OrderError> {
    if order.user_id != caller {
        return Err(OrderError::NotOwner);
    }
    if order.status != OrderStatus::Pending {
        return Err(OrderError::NotPending);
    }
    if now - order.created_at > Duration::hours(CANCELLATION_WINDOW_HOURS) {
        return Err(OrderError::WindowExpired);
    }

    Ok(())
}

/// Check an admin status change against the transition table.
///
/// # Errors
///
/// Returns `OrderError::InvalidTransition` for self-transitions and
/// moves out of a terminal status.
pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(OrderError::InvalidTransition { from, to })
    }
}

/// Order workflow service.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    mailer: Option<&'a EmailService>,
    ops_email: &'a Email,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, mailer: Option<&'a EmailService>, ops_email: &'a Email) -> Self {
        Self {
            pool,
            mailer,
            ops_email,
        }
    }

    /// Place an order from the caller's requested lines.
    ///
    /// Prices the lines, writes the order atomically (snapshot rows and
    /// cart pruning included), then alerts the ops address.
    ///
    /// # Errors
    ///
    /// Returns a pricing error when a line can't be resolved, or
    /// `OrderError::Repository` when a statement fails.
    pub async fn place(
        &self,
        caller: &CurrentUser,
        requested: &[OrderLineInput],
        address_id: AddressId,
        payment_method: PaymentMethod,
    ) -> Result<(Order, Vec<OrderItem>, Option<Address>), OrderError> {
        let mut ids: Vec<ProductId> = requested.iter().map(|line| line.product_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let products = db::products::fetch_many(self.pool, &ids).await?;
        let (lines, total) = resolve_pricing(&products, requested)?;

        let new_order = NewOrder {
            user_id: caller.id,
            address_id,
            lines,
            total,
            payment_method,
        };

        let order = db::orders::create(self.pool, &new_order).await?;
        let items = db::orders::items_for(self.pool, order.id).await?;
        let address = db::addresses::get(self.pool, caller.id, address_id).await?;

        tracing::info!(
            order_id = %order.id,
            user_id = %caller.id,
            total = %order.total_price,
            "Order placed"
        );

        if let Some(mailer) = self.mailer
            && let Err(e) = mailer
                .send_order_placed(
                    self.ops_email,
                    &caller.name,
                    caller.email.as_str(),
                    &order,
                    &items,
                    address.as_ref(),
                )
                .await
        {
            tracing::warn!(order_id = %order.id, error = %e, "Failed to send order alert");
        }

        Ok((order, items, address))
    }

    /// Cancel one of the caller's pending orders.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound`, `OrderError::NotOwner`,
    /// `OrderError::NotPending` or `OrderError::WindowExpired` when the
    /// gate refuses.
    pub async fn cancel(
        &self,
        caller: &CurrentUser,
        order_id: OrderId,
        reason: Option<&str>,
    ) -> Result<(Order, Vec<OrderItem>, Option<Address>), OrderError> {
        let order = db::orders::get(self.pool, order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        check_cancellable(&order, caller.id, Utc::now())?;

        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_CANCELLATION_REASON);

        let order = db::orders::cancel(self.pool, order_id, CancelledBy::User, Some(reason))
            .await
            .map_err(|e| match e {
                // Lost a race with another transition.
                RepositoryError::Conflict(_) => OrderError::NotPending,
                other => OrderError::Repository(other),
            })?;

        let items = db::orders::items_for(self.pool, order.id).await?;
        let address = db::addresses::get(self.pool, order.user_id, order.address_id).await?;

        tracing::info!(order_id = %order.id, user_id = %caller.id, "Order cancelled by customer");

        if let Some(mailer) = self.mailer
            && let Err(e) = mailer
                .send_order_cancelled(
                    self.ops_email,
                    &caller.name,
                    caller.email.as_str(),
                    &order,
                    &items,
                    address.as_ref(),
                )
                .await
        {
            tracing::warn!(order_id = %order.id, error = %e, "Failed to send cancellation alert");
        }

        Ok((order, items, address))
    }

    /// Admin: move an order through the status table and notify the
    /// customer.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` or `OrderError::InvalidTransition`
    /// when the change is refused.
    pub async fn transition(
        &self,
        order_id: OrderId,
        to: OrderStatus,
        reason: Option<&str>,
    ) -> Result<Order, OrderError> {
        let order = db::orders::get(self.pool, order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        let previous = order.status;
        validate_transition(previous, to)?;

        let reason = (to == OrderStatus::Cancelled).then(|| {
            reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or(DEFAULT_CANCELLATION_REASON)
        });

        let updated = db::orders::update_status(self.pool, order_id, previous, to, reason)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => OrderError::InvalidTransition { from: previous, to },
                other => OrderError::Repository(other),
            })?;

        tracing::info!(
            order_id = %updated.id,
            from = %previous,
            to = %updated.status,
            "Order status changed"
        );

        if let Some(mailer) = self.mailer {
            match db::users::get_by_id(self.pool, updated.user_id).await {
                Ok(Some(customer)) => {
                    if let Err(e) = mailer
                        .send_status_update(&customer.email, &customer.name, &updated, previous)
                        .await
                    {
                        tracing::warn!(
                            order_id = %updated.id,
                            error = %e,
                            "Failed to send status update email"
                        );
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(order_id = %updated.id, error = %e, "Could not load customer for email");
                }
            }
        }

        Ok(updated)
    }

    /// Line items and resolved address for one order view.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if a query fails.
    pub async fn load_view_parts(
        &self,
        order: &Order,
    ) -> Result<(Vec<OrderItem>, Option<Address>), OrderError> {
        let items = db::orders::items_for(self.pool, order.id).await?;
        let address = db::addresses::get(self.pool, order.user_id, order.address_id).await?;

        Ok((items, address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i32, price: Decimal, is_deleted: bool) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            price,
            images: vec![],
            category_id: None,
            tags: vec![],
            quantity: 10,
            is_active: !is_deleted,
            is_featured: false,
            is_deleted,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(id: i32, qty: i32) -> OrderLineInput {
        OrderLineInput {
            product_id: ProductId::new(id),
            qty,
        }
    }

    fn pending_order(user: i32, placed_at: DateTime<Utc>) -> Order {
        Order {
            id: OrderId::new(1),
            user_id: UserId::new(user),
            address_id: AddressId::new(1),
            total_price: Decimal::new(49900, 2),
            payment_method: PaymentMethod::Cod,
            is_paid: true,
            paid_at: Some(placed_at),
            gateway_order_id: None,
            status: OrderStatus::Pending,
            cancelled_by: None,
            cancellation_reason: None,
            cancelled_at: None,
            created_at: placed_at,
            updated_at: placed_at,
        }
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn pricing_totals_lines() {
        let products = vec![
            product(1, Decimal::new(29900, 2), false),
            product(2, Decimal::new(9950, 2), false),
        ];
        let requested = vec![line(1, 2), line(2, 3)];

        let (lines, total) = resolve_pricing(&products, &requested).unwrap();

        assert_eq!(lines.len(), 2);
        // 2 * 299.00 + 3 * 99.50
        assert_eq!(total, Decimal::new(89650, 2));
        let first = lines.first().unwrap();
        assert_eq!(first.unit_price, Decimal::new(29900, 2));
        assert_eq!(first.qty, 2);
    }

    #[test]
    fn pricing_rejects_empty_order() {
        let products = vec![product(1, Decimal::ONE, false)];
        assert!(matches!(
            resolve_pricing(&products, &[]),
            Err(OrderError::EmptyOrder)
        ));
    }

    #[test]
    fn pricing_rejects_zero_quantity() {
        let products = vec![product(1, Decimal::ONE, false)];
        assert!(matches!(
            resolve_pricing(&products, &[line(1, 0)]),
            Err(OrderError::InvalidQuantity)
        ));
    }

    #[test]
    fn pricing_fails_whole_order_on_unknown_id() {
        let products = vec![product(1, Decimal::ONE, false)];
        let requested = vec![line(1, 1), line(99, 1)];

        let err = resolve_pricing(&products, &requested);
        assert!(matches!(err, Err(OrderError::UnknownProduct(id)) if id == ProductId::new(99)));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn pricing_accepts_soft_deleted_products() {
        let products = vec![product(1, Decimal::new(15000, 2), true)];

        let (lines, total) = resolve_pricing(&products, &[line(1, 1)]).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(total, Decimal::new(15000, 2));
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn pricing_keeps_duplicate_lines_separate() {
        let products = vec![product(1, Decimal::new(10000, 2), false)];
        let requested = vec![line(1, 1), line(1, 2)];

        let (lines, total) = resolve_pricing(&products, &requested).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(total, Decimal::new(30000, 2));
    }

    #[test]
    fn gate_rejects_non_owner_first() {
        let placed = Utc::now() - Duration::hours(30);
        let mut order = pending_order(1, placed);
        order.status = OrderStatus::Delivered;

        // Wrong owner outranks wrong status and the expired window.
        let err = check_cancellable(&order, UserId::new(2), Utc::now());
        assert!(matches!(err, Err(OrderError::NotOwner)));
    }

    #[test]
    fn gate_rejects_non_pending() {
        let mut order = pending_order(1, Utc::now());
        order.status = OrderStatus::Processing;

        let err = check_cancellable(&order, UserId::new(1), Utc::now());
        assert!(matches!(err, Err(OrderError::NotPending)));
    }

    #[test]
    fn gate_closes_after_24_hours() {
        let now = Utc::now();
        let order = pending_order(1, now - Duration::hours(24) - Duration::seconds(1));

        let err = check_cancellable(&order, UserId::new(1), now);
        assert!(matches!(err, Err(OrderError::WindowExpired)));
    }

    #[test]
    fn gate_allows_at_exactly_24_hours() {
        let now = Utc::now();
        let order = pending_order(1, now - Duration::hours(24));

        assert!(check_cancellable(&order, UserId::new(1), now).is_ok());
    }

    #[test]
    fn gate_allows_fresh_pending_order() {
        let now = Utc::now();
        let order = pending_order(1, now - Duration::minutes(5));

        assert!(check_cancellable(&order, UserId::new(1), now).is_ok());
    }

    #[test]
    fn transitions_follow_the_table() {
        use OrderStatus::{Cancelled, Delivered, Pending, Processing, Ready};

        assert!(validate_transition(Pending, Processing).is_ok());
        assert!(validate_transition(Pending, Cancelled).is_ok());
        assert!(validate_transition(Processing, Delivered).is_ok());
        assert!(validate_transition(Ready, Delivered).is_ok());

        assert!(matches!(
            validate_transition(Delivered, Pending),
            Err(OrderError::InvalidTransition { .. })
        ));
        assert!(matches!(
            validate_transition(Cancelled, Processing),
            Err(OrderError::InvalidTransition { .. })
        ));
        // Self-transitions are not in the table.
        assert!(validate_transition(Pending, Pending).is_err());
    }

    #[test]
    fn gate_refusals_keep_their_wording() {
        // Storefront clients match on these strings.
        assert_eq!(
            OrderError::NotPending.to_string(),
            "Only pending orders can be cancelled"
        );
        assert_eq!(
            OrderError::WindowExpired.to_string(),
            "Cannot cancel after 24 hours"
        );
    }
}
