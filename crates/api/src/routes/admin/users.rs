//! Admin user management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use marigold_core::{Email, UserId};

use crate::db;
use crate::error::{ApiError, Result};
use crate::middleware::RequireAdmin;
use crate::models::UserProfile;
use crate::state::AppState;

/// Request body for an admin user edit.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_admin: Option<bool>,
}

/// GET /api/admin/users
///
/// Every account, newest first. Password hashes never leave the row
/// type.
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn list(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<Vec<UserProfile>>> {
    let users = db::users::list_all(state.pool()).await?;

    Ok(Json(users.iter().map(UserProfile::from).collect()))
}

/// GET /api/admin/users/{id}
///
/// # Errors
///
/// Returns 404 for unknown users.
pub async fn get(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<UserProfile>> {
    let user = db::users::get_by_id(state.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(UserProfile::from(&user)))
}

/// PUT /api/admin/users/{id}
///
/// Partial edit of name, email and the admin flag.
///
/// # Errors
///
/// Returns 400 for a malformed email, 404 for unknown users and 409
/// when the new email is already taken.
pub async fn update(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<UserId>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserProfile>> {
    let email = match req.email.as_deref() {
        Some(raw) => Some(
            Email::parse(raw)
                .map_err(|_| ApiError::InvalidRequest("Invalid email address".to_owned()))?,
        ),
        None => None,
    };

    let name = req.name.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let user = db::users::admin_update(state.pool(), id, name, email.as_ref(), req.is_admin).await?;

    tracing::info!(user_id = %user.id, "user updated by admin");

    Ok(Json(UserProfile::from(&user)))
}

/// DELETE /api/admin/users/{id}
///
/// Cart and addresses go with the account; order history blocks the
/// delete.
///
/// # Errors
///
/// Returns 404 for unknown users and 409 when orders still reference
/// the account.
pub async fn delete(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<StatusCode> {
    db::users::delete(state.pool(), id).await?;

    tracing::info!(user_id = %id, "user deleted by admin");

    Ok(StatusCode::NO_CONTENT)
}
