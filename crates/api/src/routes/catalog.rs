//! Public catalog routes: products and categories.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use marigold_core::{CategoryId, ProductId};

use crate::db;
use crate::error::{ApiError, Result};
use crate::models::{Category, Product};
use crate::state::AppState;

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<CategoryId>,
    pub tag: Option<String>,
}

/// GET /api/products
///
/// Active, non-deleted products, newest first, optionally filtered by
/// category and tag.
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Vec<Product>>> {
    let products =
        db::products::list_public(state.pool(), query.category, query.tag.as_deref()).await?;

    Ok(Json(products))
}

/// GET /api/products/featured
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn featured_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = db::products::list_featured(state.pool()).await?;

    Ok(Json(products))
}

/// GET /api/products/{id}
///
/// # Errors
///
/// Returns 404 for unknown or soft-deleted products.
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = db::products::get(state.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product"))?;

    Ok(Json(product))
}

/// GET /api/categories
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = db::categories::list_active(state.pool()).await?;

    Ok(Json(categories))
}
