//! Address book routes.
//!
//! Addresses are owner-scoped: every query filters by the session user,
//! so ids belonging to someone else behave exactly like missing rows.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use marigold_core::AddressId;

use crate::db;
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::{Address, AddressForm};
use crate::state::AppState;

/// GET /api/addresses
///
/// # Errors
///
/// Returns 500 if the query fails.
pub async fn list(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<Address>>> {
    let addresses = db::addresses::list_for_user(state.pool(), user.id).await?;

    Ok(Json(addresses))
}

/// POST /api/addresses
///
/// The first saved address becomes the default; an explicit default
/// flag demotes the previous default in the same transaction.
///
/// # Errors
///
/// Returns 500 if the insert fails.
pub async fn create(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(form): Json<AddressForm>,
) -> Result<(StatusCode, Json<Address>)> {
    let address = db::addresses::create(state.pool(), user.id, &form).await?;

    Ok((StatusCode::CREATED, Json(address)))
}

/// PUT /api/addresses/{id}
///
/// # Errors
///
/// Returns 404 when the address doesn't exist or isn't the caller's.
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<AddressId>,
    Json(form): Json<AddressForm>,
) -> Result<Json<Address>> {
    let address = db::addresses::update(state.pool(), user.id, id, &form).await?;

    Ok(Json(address))
}

/// DELETE /api/addresses/{id}
///
/// Orders that referenced the address keep their id and resolve to
/// `null` from then on.
///
/// # Errors
///
/// Returns 404 when the address doesn't exist or isn't the caller's.
pub async fn delete(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    db::addresses::delete(state.pool(), user.id, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/addresses/{id}/default
///
/// # Errors
///
/// Returns 404 when the address doesn't exist or isn't the caller's.
pub async fn set_default(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(id): Path<AddressId>,
) -> Result<Json<Address>> {
    let address = db::addresses::set_default(state.pool(), user.id, id).await?;

    Ok(Json(address))
}
