//! Customer order routes: placement, history, cancellation.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use marigold_core::{AddressId, OrderId, PaymentMethod};

use crate::db;
use crate::error::{ApiError, Result};
use crate::middleware::RequireUser;
use crate::models::{Address, OrderItem, OrderView};
use crate::services::orders::{OrderLineInput, OrderService};
use crate::state::AppState;

/// Request body for placing an order.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderLineInput>,
    pub address_id: AddressId,
    pub payment_method: PaymentMethod,
}

/// Request body for cancelling an order.
#[derive(Debug, Default, Deserialize)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

/// POST /api/orders
///
/// Prices the requested lines against the catalog, writes the order and
/// prunes the ordered products from the cart in one transaction, then
/// alerts the ops inbox.
///
/// # Errors
///
/// Returns 400 for empty or unpriceable line sets.
pub async fn place(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderView>)> {
    let service = OrderService::new(state.pool(), state.mailer(), state.ops_email());
    let (order, items, address) = service
        .place(&user, &req.items, req.address_id, req.payment_method)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderView::assemble(&order, &items, address)),
    ))
}

/// GET /api/orders
///
/// The caller's orders, newest first, with line items and resolved
/// addresses.
///
/// # Errors
///
/// Returns 500 if a query fails.
pub async fn list(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<OrderView>>> {
    let orders = db::orders::list_for_user(state.pool(), user.id).await?;

    let ids: Vec<OrderId> = orders.iter().map(|order| order.id).collect();
    let mut items_by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
    for item in db::orders::items_for_many(state.pool(), &ids).await? {
        items_by_order.entry(item.order_id).or_default().push(item);
    }

    // One address list lookup covers every order; dangling ids miss
    let addresses: HashMap<AddressId, Address> =
        db::addresses::list_for_user(state.pool(), user.id)
            .await?
            .into_iter()
            .map(|address| (address.id, address))
            .collect();

    let views = orders
        .iter()
        .map(|order| {
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            let address = addresses.get(&order.address_id).cloned();
            OrderView::assemble(order, &items, address)
        })
        .collect();

    Ok(Json(views))
}

/// GET /api/orders/{id}
///
/// # Errors
///
/// Returns 404 for unknown orders and 403 when the caller neither owns
/// the order nor is an admin.
pub async fn get(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let order = db::orders::get(state.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order"))?;

    if order.user_id != user.id && !user.is_admin {
        return Err(ApiError::Forbidden(
            "You do not have access to this order".to_owned(),
        ));
    }

    let service = OrderService::new(state.pool(), state.mailer(), state.ops_email());
    let (items, address) = service.load_view_parts(&order).await?;

    Ok(Json(OrderView::assemble(&order, &items, address)))
}

/// PUT /api/orders/{id}/cancel
///
/// Customer cancellation. Guards run in order: the order must exist,
/// belong to the caller, still be pending, and be younger than the
/// cancellation window.
///
/// # Errors
///
/// Returns 404, 403 or 409 as the corresponding guard refuses.
pub async fn cancel(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<OrderId>,
    Json(req): Json<CancelOrderRequest>,
) -> Result<Json<OrderView>> {
    let service = OrderService::new(state.pool(), state.mailer(), state.ops_email());
    let (order, items, address) = service.cancel(&user, id, req.reason.as_deref()).await?;

    Ok(Json(OrderView::assemble(&order, &items, address)))
}
