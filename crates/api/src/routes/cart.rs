//! Cart routes.
//!
//! Every mutation returns the refreshed cart so clients re-render from
//! one response. Lines carry live product data; prices are frozen only
//! when an order is placed.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use marigold_core::ProductId;

use crate::db;
use crate::error::{ApiError, Result};
use crate::middleware::RequireUser;
use crate::models::CartView;
use crate::state::AppState;

/// Request body for adding a product to the cart.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_qty")]
    pub qty: i32,
}

/// Request body for setting a line quantity.
#[derive(Debug, Deserialize)]
pub struct SetQtyRequest {
    pub qty: i32,
}

const fn default_qty() -> i32 {
    1
}

async fn current_cart(state: &AppState, user_id: marigold_core::UserId) -> Result<Json<CartView>> {
    let lines = db::carts::lines(state.pool(), user_id).await?;

    Ok(Json(CartView::from_lines(lines)))
}

/// GET /api/cart
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<CartView>> {
    current_cart(&state, user.id).await
}

/// POST /api/cart
///
/// Adds a product; if the line already exists its quantity is
/// incremented by the requested amount.
///
/// # Errors
///
/// Returns 400 for qty < 1 and 404 for unknown or deleted products.
pub async fn add_item(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    if req.qty < 1 {
        return Err(ApiError::InvalidRequest(
            "Quantity must be at least 1".to_owned(),
        ));
    }

    db::products::get(state.pool(), req.product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product"))?;

    db::carts::add_item(state.pool(), user.id, req.product_id, req.qty).await?;

    current_cart(&state, user.id).await
}

/// PUT /api/cart/{productId}
///
/// # Errors
///
/// Returns 400 for qty < 1 and 404 when the line is absent.
pub async fn set_qty(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(product_id): Path<ProductId>,
    Json(req): Json<SetQtyRequest>,
) -> Result<Json<CartView>> {
    if req.qty < 1 {
        return Err(ApiError::InvalidRequest(
            "Quantity must be at least 1".to_owned(),
        ));
    }

    db::carts::set_qty(state.pool(), user.id, product_id, req.qty).await?;

    current_cart(&state, user.id).await
}

/// DELETE /api/cart/{productId}
///
/// Removing a line that isn't there is a no-op.
///
/// # Errors
///
/// Returns 500 if the statement fails.
pub async fn remove_item(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartView>> {
    db::carts::remove_item(state.pool(), user.id, product_id).await?;

    current_cart(&state, user.id).await
}

/// DELETE /api/cart
///
/// # Errors
///
/// Returns 500 if the statement fails.
pub async fn clear(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<CartView>> {
    db::carts::clear(state.pool(), user.id).await?;

    current_cart(&state, user.id).await
}
