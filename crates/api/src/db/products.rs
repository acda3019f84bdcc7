//! Database operations for products.
//!
//! Product deletion is soft. Listings and lookups filter `is_deleted`;
//! `fetch_many` deliberately does not, because order pricing must still
//! see products that were delisted while sitting in someone's cart.

use sqlx::PgPool;

use marigold_core::{CategoryId, ProductId};

use super::RepositoryError;
use crate::models::{Product, ProductForm, ProductPatch};

/// List active products for the storefront, optionally narrowed to a
/// category and/or a tag. Newest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_public(
    pool: &PgPool,
    category_id: Option<CategoryId>,
    tag: Option<&str>,
) -> Result<Vec<Product>, RepositoryError> {
    let products = sqlx::query_as::<_, Product>(
        r"
        SELECT id, name, description, price, images, category_id, tags,
               quantity, is_active, is_featured, is_deleted, created_at, updated_at
        FROM products
        WHERE is_deleted = FALSE
          AND is_active = TRUE
          AND ($1::INT IS NULL OR category_id = $1)
          AND ($2::TEXT IS NULL OR $2 = ANY(tags))
        ORDER BY created_at DESC
        ",
    )
    .bind(category_id)
    .bind(tag)
    .fetch_all(pool)
    .await?;

    Ok(products)
}

/// List featured products for the storefront landing page.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_featured(pool: &PgPool) -> Result<Vec<Product>, RepositoryError> {
    let products = sqlx::query_as::<_, Product>(
        r"
        SELECT id, name, description, price, images, category_id, tags,
               quantity, is_active, is_featured, is_deleted, created_at, updated_at
        FROM products
        WHERE is_deleted = FALSE AND is_active = TRUE AND is_featured = TRUE
        ORDER BY created_at DESC
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(products)
}

/// List every non-deleted product, including inactive ones (admin).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_all(pool: &PgPool) -> Result<Vec<Product>, RepositoryError> {
    let products = sqlx::query_as::<_, Product>(
        r"
        SELECT id, name, description, price, images, category_id, tags,
               quantity, is_active, is_featured, is_deleted, created_at, updated_at
        FROM products
        WHERE is_deleted = FALSE
        ORDER BY created_at DESC
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(products)
}

/// Get a non-deleted product by id.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get(pool: &PgPool, id: ProductId) -> Result<Option<Product>, RepositoryError> {
    let product = sqlx::query_as::<_, Product>(
        r"
        SELECT id, name, description, price, images, category_id, tags,
               quantity, is_active, is_featured, is_deleted, created_at, updated_at
        FROM products
        WHERE id = $1 AND is_deleted = FALSE
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(product)
}

/// Fetch a batch of products by id, deleted ones included.
///
/// Order placement prices whatever rows exist; ids with no row at all
/// are the caller's problem to reject.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn fetch_many(
    pool: &PgPool,
    ids: &[ProductId],
) -> Result<Vec<Product>, RepositoryError> {
    let raw_ids: Vec<i32> = ids.iter().copied().map(i32::from).collect();

    let products = sqlx::query_as::<_, Product>(
        r"
        SELECT id, name, description, price, images, category_id, tags,
               quantity, is_active, is_featured, is_deleted, created_at, updated_at
        FROM products
        WHERE id = ANY($1)
        ",
    )
    .bind(raw_ids)
    .fetch_all(pool)
    .await?;

    Ok(products)
}

/// Create a product.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn create(pool: &PgPool, form: &ProductForm) -> Result<Product, RepositoryError> {
    let product = sqlx::query_as::<_, Product>(
        r"
        INSERT INTO products
            (name, description, price, images, category_id, tags,
             quantity, is_active, is_featured)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, name, description, price, images, category_id, tags,
                  quantity, is_active, is_featured, is_deleted, created_at, updated_at
        ",
    )
    .bind(&form.name)
    .bind(&form.description)
    .bind(form.price)
    .bind(&form.images)
    .bind(form.category_id)
    .bind(&form.tags)
    .bind(form.quantity)
    .bind(form.is_active)
    .bind(form.is_featured)
    .fetch_one(pool)
    .await?;

    Ok(product)
}

/// Partially update a non-deleted product.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product doesn't exist or
/// was deleted.
pub async fn update(
    pool: &PgPool,
    id: ProductId,
    patch: &ProductPatch,
) -> Result<Product, RepositoryError> {
    sqlx::query_as::<_, Product>(
        r"
        UPDATE products
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            price = COALESCE($4, price),
            images = COALESCE($5, images),
            category_id = COALESCE($6, category_id),
            tags = COALESCE($7, tags),
            quantity = COALESCE($8, quantity),
            is_active = COALESCE($9, is_active),
            is_featured = COALESCE($10, is_featured),
            updated_at = NOW()
        WHERE id = $1 AND is_deleted = FALSE
        RETURNING id, name, description, price, images, category_id, tags,
                  quantity, is_active, is_featured, is_deleted, created_at, updated_at
        ",
    )
    .bind(id)
    .bind(&patch.name)
    .bind(&patch.description)
    .bind(patch.price)
    .bind(&patch.images)
    .bind(patch.category_id)
    .bind(&patch.tags)
    .bind(patch.quantity)
    .bind(patch.is_active)
    .bind(patch.is_featured)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Soft-delete a product. Its order snapshots stay intact.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product doesn't exist or
/// was already deleted.
pub async fn soft_delete(pool: &PgPool, id: ProductId) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE products
        SET is_deleted = TRUE, is_active = FALSE, updated_at = NOW()
        WHERE id = $1 AND is_deleted = FALSE
        ",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}

/// Live products: active and not soft-deleted (dashboard stat).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count(pool: &PgPool) -> Result<i64, RepositoryError> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM products WHERE is_deleted = FALSE AND is_active = TRUE",
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}
