//! Order row and view types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use marigold_core::{
    AddressId, CancelledBy, Email, OrderId, OrderStatus, PaymentMethod, ProductId, UserId,
};

use super::address::Address;

/// An order as stored in the `orders` table.
///
/// `total_price` and the line items are snapshots taken at placement;
/// later catalog edits never change what the customer agreed to pay.
/// `address_id` is a bare reference (no foreign key) resolved against
/// the owner's current address list at read time.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub address_id: AddressId,
    pub total_price: Decimal,
    pub payment_method: PaymentMethod,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub gateway_order_id: Option<String>,
    pub status: OrderStatus,
    pub cancelled_by: Option<CancelledBy>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line item snapshot on an order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItem {
    pub id: i32,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Decimal,
    pub qty: i32,
}

/// A cart line with its price frozen by the pricing pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub qty: i32,
}

/// Everything the order writer needs to persist in one transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub address_id: AddressId,
    pub lines: Vec<PricedLine>,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
}

/// A line item as serialized in order responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub qty: i32,
    pub line_total: Decimal,
}

impl From<&OrderItem> for OrderItemView {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.product_name.clone(),
            unit_price: item.unit_price,
            qty: item.qty,
            line_total: item.unit_price * Decimal::from(item.qty),
        }
    }
}

/// The customer attached to an order in admin views.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCustomer {
    pub id: UserId,
    pub name: String,
    pub email: Email,
}

/// A full order as returned to clients.
///
/// `address` is the resolved shipping address or `null` when the
/// referenced address no longer exists; `customer` is only populated
/// for admin reads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: OrderId,
    pub status: OrderStatus,
    pub total_price: Decimal,
    pub payment_method: PaymentMethod,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItemView>,
    pub address: Option<Address>,
    pub cancelled_by: Option<CancelledBy>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<OrderCustomer>,
}

impl OrderView {
    /// Assemble a view from its parts.
    #[must_use]
    pub fn assemble(order: &Order, items: &[OrderItem], address: Option<Address>) -> Self {
        Self {
            id: order.id,
            status: order.status,
            total_price: order.total_price,
            payment_method: order.payment_method,
            is_paid: order.is_paid,
            paid_at: order.paid_at,
            items: items.iter().map(OrderItemView::from).collect(),
            address,
            cancelled_by: order.cancelled_by,
            cancellation_reason: order.cancellation_reason.clone(),
            cancelled_at: order.cancelled_at,
            created_at: order.created_at,
            customer: None,
        }
    }

    /// Attach the customer for admin views.
    #[must_use]
    pub fn with_customer(mut self, customer: OrderCustomer) -> Self {
        self.customer = Some(customer);
        self
    }
}
