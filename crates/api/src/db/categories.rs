//! Database operations for product categories.

use sqlx::PgPool;

use marigold_core::CategoryId;

use super::RepositoryError;
use crate::models::Category;

/// List active categories in name order (public catalog).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_active(pool: &PgPool) -> Result<Vec<Category>, RepositoryError> {
    let categories = sqlx::query_as::<_, Category>(
        r"
        SELECT id, name, slug, description, is_active, created_at
        FROM categories
        WHERE is_active = TRUE
        ORDER BY name
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(categories)
}

/// List every category, active or not (admin).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_all(pool: &PgPool) -> Result<Vec<Category>, RepositoryError> {
    let categories = sqlx::query_as::<_, Category>(
        r"
        SELECT id, name, slug, description, is_active, created_at
        FROM categories
        ORDER BY name
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(categories)
}

/// Get a category by id.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get(pool: &PgPool, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
    let category = sqlx::query_as::<_, Category>(
        r"
        SELECT id, name, slug, description, is_active, created_at
        FROM categories
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(category)
}

/// Create a category.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the name or slug is taken.
pub async fn create(
    pool: &PgPool,
    name: &str,
    slug: &str,
    description: Option<&str>,
) -> Result<Category, RepositoryError> {
    sqlx::query_as::<_, Category>(
        r"
        INSERT INTO categories (name, slug, description)
        VALUES ($1, $2, $3)
        RETURNING id, name, slug, description, is_active, created_at
        ",
    )
    .bind(name)
    .bind(slug)
    .bind(description)
    .fetch_one(pool)
    .await
    .map_err(|e| RepositoryError::from_sqlx(e, "category name or slug already exists"))
}

/// Partially update a category.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the category doesn't exist and
/// `RepositoryError::Conflict` if the new name or slug collides.
pub async fn update(
    pool: &PgPool,
    id: CategoryId,
    name: Option<&str>,
    slug: Option<&str>,
    description: Option<&str>,
    is_active: Option<bool>,
) -> Result<Category, RepositoryError> {
    sqlx::query_as::<_, Category>(
        r"
        UPDATE categories
        SET name = COALESCE($2, name),
            slug = COALESCE($3, slug),
            description = COALESCE($4, description),
            is_active = COALESCE($5, is_active)
        WHERE id = $1
        RETURNING id, name, slug, description, is_active, created_at
        ",
    )
    .bind(id)
    .bind(name)
    .bind(slug)
    .bind(description)
    .bind(is_active)
    .fetch_optional(pool)
    .await
    .map_err(|e| RepositoryError::from_sqlx(e, "category name or slug already exists"))?
    .ok_or(RepositoryError::NotFound)
}

/// Flip a category's storefront visibility.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the category doesn't exist.
pub async fn toggle(pool: &PgPool, id: CategoryId) -> Result<Category, RepositoryError> {
    sqlx::query_as::<_, Category>(
        r"
        UPDATE categories
        SET is_active = NOT is_active
        WHERE id = $1
        RETURNING id, name, slug, description, is_active, created_at
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Delete a category. Products in it fall back to uncategorised.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the category doesn't exist.
pub async fn delete(pool: &PgPool, id: CategoryId) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}
