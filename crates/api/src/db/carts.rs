//! Database operations for shopping carts.
//!
//! Carts are created lazily: the first add upserts the cart row, so
//! there is no separate "create cart" step anywhere in the API.

use rust_decimal::Decimal;
use sqlx::PgPool;

use marigold_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::ProductSummary;

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: ProductId,
    name: String,
    price: Decimal,
    images: Vec<String>,
    qty: i32,
}

/// The user's cart lines in insertion order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lines(
    pool: &PgPool,
    user_id: UserId,
) -> Result<Vec<(ProductSummary, i32)>, RepositoryError> {
    let rows = sqlx::query_as::<_, CartLineRow>(
        r"
        SELECT p.id, p.name, p.price, p.images, ci.qty
        FROM carts c
        JOIN cart_items ci ON ci.cart_id = c.id
        JOIN products p ON p.id = ci.product_id
        WHERE c.user_id = $1
        ORDER BY ci.id
        ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            (
                ProductSummary {
                    id: row.id,
                    name: row.name,
                    price: row.price,
                    images: row.images,
                },
                row.qty,
            )
        })
        .collect())
}

/// Add a product to the user's cart, creating the cart if needed.
///
/// Re-adding a product increments its quantity instead of duplicating
/// the line.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the statement fails (an
/// unknown product id surfaces as a foreign key violation; callers
/// validate the product first for a friendlier error).
pub async fn add_item(
    pool: &PgPool,
    user_id: UserId,
    product_id: ProductId,
    qty: i32,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        WITH c AS (
            INSERT INTO carts (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW()
            RETURNING id
        )
        INSERT INTO cart_items (cart_id, product_id, qty)
        SELECT c.id, $2, $3 FROM c
        ON CONFLICT (cart_id, product_id)
        DO UPDATE SET qty = cart_items.qty + EXCLUDED.qty
        ",
    )
    .bind(user_id)
    .bind(product_id)
    .bind(qty)
    .execute(pool)
    .await?;

    Ok(())
}

/// Set the quantity of a cart line.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product isn't in the cart.
pub async fn set_qty(
    pool: &PgPool,
    user_id: UserId,
    product_id: ProductId,
    qty: i32,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE cart_items ci
        SET qty = $3
        FROM carts c
        WHERE ci.cart_id = c.id AND c.user_id = $1 AND ci.product_id = $2
        ",
    )
    .bind(user_id)
    .bind(product_id)
    .bind(qty)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}

/// Remove a product from the cart. Removing a product that isn't there
/// is a no-op.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the statement fails.
pub async fn remove_item(
    pool: &PgPool,
    user_id: UserId,
    product_id: ProductId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        DELETE FROM cart_items ci
        USING carts c
        WHERE ci.cart_id = c.id AND c.user_id = $1 AND ci.product_id = $2
        ",
    )
    .bind(user_id)
    .bind(product_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Empty the user's cart.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the statement fails.
pub async fn clear(pool: &PgPool, user_id: UserId) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        DELETE FROM cart_items ci
        USING carts c
        WHERE ci.cart_id = c.id AND c.user_id = $1
        ",
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}
