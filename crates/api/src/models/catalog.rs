//! Catalog row types: categories and products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marigold_core::{CategoryId, ProductId};

/// A product category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A product.
///
/// Deletion is soft (`is_deleted`); deleted products disappear from
/// every listing but stay priceable so carts and order snapshots that
/// reference them keep working. Prices serialize as strings to avoid
/// float drift in clients.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub images: Vec<String>,
    pub category_id: Option<CategoryId>,
    pub tags: Vec<String>,
    pub quantity: i32,
    pub is_active: bool,
    pub is_featured: bool,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub updated_at: DateTime<Utc>,
}

/// Compact product projection embedded in cart and order views.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub images: Vec<String>,
}

/// Payload for creating a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub images: Vec<String>,
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
}

/// Partial update for a product. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub images: Option<Vec<String>>,
    pub category_id: Option<CategoryId>,
    pub tags: Option<Vec<String>>,
    pub quantity: Option<i32>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

const fn default_active() -> bool {
    true
}
