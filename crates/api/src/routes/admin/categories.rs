//! Admin category management.
//!
//! Slugs are derived from the name on create and whenever the name
//! changes, so a category's URL identity follows its display name.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use marigold_core::CategoryId;

use crate::db;
use crate::error::{ApiError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Category;
use crate::state::AppState;

/// Request body for creating a category.
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Request body for updating a category.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Lowercase, alphanumeric, dash-separated slug of a display name.
fn slugify(name: &str) -> String {
    let mut slug = String::new();
    let mut prev_dash = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            prev_dash = false;
        } else if (c.is_whitespace() || c == '-' || c == '_') && !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    slug.trim_matches('-').to_owned()
}

/// GET /api/admin/categories
///
/// All categories, inactive ones included.
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn list(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<Category>>> {
    let categories = db::categories::list_all(state.pool()).await?;

    Ok(Json(categories))
}

/// POST /api/admin/categories
///
/// # Errors
///
/// Returns 400 for an empty name and 409 when the name or slug already
/// exists.
pub async fn create(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let name = req.name.trim();
    let slug = slugify(name);
    if name.is_empty() || slug.is_empty() {
        return Err(ApiError::InvalidRequest("name is required".to_owned()));
    }

    let category =
        db::categories::create(state.pool(), name, &slug, req.description.as_deref()).await?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/admin/categories/{id}
///
/// # Errors
///
/// Returns 404 for unknown categories and 409 on name or slug
/// collisions.
pub async fn update(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<CategoryId>,
    Json(req): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>> {
    let name = req.name.as_deref().map(str::trim);
    if let Some(name) = name
        && name.is_empty()
    {
        return Err(ApiError::InvalidRequest("name is required".to_owned()));
    }
    let slug = name.map(slugify);

    let category = db::categories::update(
        state.pool(),
        id,
        name,
        slug.as_deref(),
        req.description.as_deref(),
        req.is_active,
    )
    .await?;

    Ok(Json(category))
}

/// PUT /api/admin/categories/{id}/toggle
///
/// # Errors
///
/// Returns 404 for unknown categories.
pub async fn toggle(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>> {
    let category = db::categories::toggle(state.pool(), id).await?;

    Ok(Json(category))
}

/// DELETE /api/admin/categories/{id}
///
/// Products in the category fall back to uncategorised.
///
/// # Errors
///
/// Returns 404 for unknown categories.
pub async fn delete(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    db::categories::delete(state.pool(), id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_lowercases_and_dashes() {
        assert_eq!(slugify("Pooja Essentials"), "pooja-essentials");
        assert_eq!(slugify("Home & Living"), "home-living");
    }

    #[test]
    fn slugify_collapses_runs_and_trims() {
        assert_eq!(slugify("  Brass -- Lamps  "), "brass-lamps");
        assert_eq!(slugify("___"), "");
    }

    #[test]
    fn slugify_keeps_digits() {
        assert_eq!(slugify("Diwali 2025 Specials"), "diwali-2025-specials");
    }
}
