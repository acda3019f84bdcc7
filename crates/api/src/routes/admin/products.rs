//! Admin product management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use marigold_core::ProductId;

use crate::db;
use crate::error::{ApiError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Product, ProductForm, ProductPatch};
use crate::state::AppState;

/// Request body for the featured toggle.
#[derive(Debug, Deserialize)]
pub struct FeaturedRequest {
    pub featured: bool,
}

fn ensure_positive_price(price: Decimal) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(ApiError::InvalidRequest(
            "Price must be greater than zero".to_owned(),
        ));
    }
    Ok(())
}

/// GET /api/admin/products
///
/// Every non-deleted product, inactive ones included.
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn list(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<Product>>> {
    let products = db::products::list_all(state.pool()).await?;

    Ok(Json(products))
}

/// POST /api/admin/products
///
/// # Errors
///
/// Returns 400 for a non-positive price.
pub async fn create(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(form): Json<ProductForm>,
) -> Result<(StatusCode, Json<Product>)> {
    if form.name.trim().is_empty() {
        return Err(ApiError::InvalidRequest("name is required".to_owned()));
    }
    ensure_positive_price(form.price)?;

    let product = db::products::create(state.pool(), &form).await?;

    tracing::info!(product_id = %product.id, "product created");

    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/admin/products/{id}
///
/// # Errors
///
/// Returns 404 for unknown or deleted products and 400 for a
/// non-positive price.
pub async fn update(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<ProductId>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<Product>> {
    if let Some(price) = patch.price {
        ensure_positive_price(price)?;
    }

    let product = db::products::update(state.pool(), id, &patch).await?;

    Ok(Json(product))
}

/// DELETE /api/admin/products/{id}
///
/// Soft delete: the product disappears from listings but order
/// snapshots and carts keep working.
///
/// # Errors
///
/// Returns 404 for unknown products.
pub async fn delete(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    db::products::soft_delete(state.pool(), id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/admin/products/{id}/featured
///
/// # Errors
///
/// Returns 404 for unknown or deleted products.
pub async fn set_featured(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<ProductId>,
    Json(req): Json<FeaturedRequest>,
) -> Result<Json<Product>> {
    let patch = ProductPatch {
        is_featured: Some(req.featured),
        ..ProductPatch::default()
    };
    let product = db::products::update(state.pool(), id, &patch).await?;

    Ok(Json(product))
}
