//! Admin order oversight: the full order book and status transitions.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use marigold_core::{AddressId, OrderId, OrderStatus, UserId};

use crate::db;
use crate::error::{ApiError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Address, OrderCustomer, OrderItem, OrderView, User};
use crate::services::orders::OrderService;
use crate::state::AppState;

/// Request body for a status transition.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub reason: Option<String>,
}

fn customer_of(user: &User) -> OrderCustomer {
    OrderCustomer {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
    }
}

/// GET /api/admin/orders
///
/// Every order, newest first, with line items, resolved addresses and
/// the customer attached.
///
/// # Errors
///
/// Returns 500 if a query fails.
pub async fn list(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<OrderView>>> {
    let orders = db::orders::list_all(state.pool()).await?;

    let order_ids: Vec<OrderId> = orders.iter().map(|order| order.id).collect();
    let mut items_by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
    for item in db::orders::items_for_many(state.pool(), &order_ids).await? {
        items_by_order.entry(item.order_id).or_default().push(item);
    }

    let address_ids: Vec<AddressId> = orders.iter().map(|order| order.address_id).collect();
    let addresses: HashMap<AddressId, Address> =
        db::addresses::get_many(state.pool(), &address_ids)
            .await?
            .into_iter()
            .map(|address| (address.id, address))
            .collect();

    // Users with orders can't be deleted, so every lookup should hit.
    let customers: HashMap<UserId, User> = db::users::list_all(state.pool())
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();

    let views = orders
        .iter()
        .map(|order| {
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            let address = addresses.get(&order.address_id).cloned();
            let view = OrderView::assemble(order, &items, address);
            match customers.get(&order.user_id) {
                Some(user) => view.with_customer(customer_of(user)),
                None => view,
            }
        })
        .collect();

    Ok(Json(views))
}

/// GET /api/admin/orders/{id}
///
/// # Errors
///
/// Returns 404 for unknown orders.
pub async fn get(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let order = db::orders::get(state.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order"))?;

    let service = OrderService::new(state.pool(), state.mailer(), state.ops_email());
    let (items, address) = service.load_view_parts(&order).await?;

    let mut view = OrderView::assemble(&order, &items, address);
    if let Some(user) = db::users::get_by_id(state.pool(), order.user_id).await? {
        view = view.with_customer(customer_of(&user));
    }

    Ok(Json(view))
}

/// PUT /api/admin/orders/{id}/status
///
/// Walks the order through the transition table and mails the customer
/// about the change. A transition to `cancelled` records the admin as
/// the cancelling actor together with the supplied reason.
///
/// # Errors
///
/// Returns 404 for unknown orders and 409 for a move the transition
/// table refuses.
pub async fn update_status(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<OrderId>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderView>> {
    let service = OrderService::new(state.pool(), state.mailer(), state.ops_email());
    let order = service
        .transition(id, req.status, req.reason.as_deref())
        .await?;

    let (items, address) = service.load_view_parts(&order).await?;

    Ok(Json(OrderView::assemble(&order, &items, address)))
}
