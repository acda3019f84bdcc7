//! Registration, login and profile routes.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{ApiError, Result};
use crate::middleware::{RequireUser, clear_current_user, set_current_user};
use crate::models::{CurrentUser, UserProfile};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Request body for registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for profile updates.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// POST /api/auth/register
///
/// Creates the account, logs it in and returns the profile.
///
/// # Errors
///
/// Returns 400 for a malformed email or weak password and 409 when the
/// email is already registered.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    if req.name.trim().is_empty() {
        return Err(ApiError::InvalidRequest("name is required".to_owned()));
    }

    let auth = AuthService::new(state.pool());
    let user = auth.register(&req.name, &req.email, &req.password).await?;

    // Session fixation defence: fresh id before the user lands in it
    session.cycle_id().await?;
    set_current_user(&session, &CurrentUser::from(&user)).await?;

    tracing::info!(user_id = %user.id, "user registered");

    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

/// POST /api/auth/login
///
/// # Errors
///
/// Returns 401 with a deliberately generic message on any failure.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<Json<UserProfile>> {
    let auth = AuthService::new(state.pool());
    let user = auth.login(&req.email, &req.password).await?;

    session.cycle_id().await?;
    set_current_user(&session, &CurrentUser::from(&user)).await?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(UserProfile::from(&user)))
}

/// POST /api/auth/logout
///
/// # Errors
///
/// Returns 500 if the session store fails.
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    session.flush().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/auth/me
///
/// # Errors
///
/// Returns 404 if the account was deleted while the session lived on.
pub async fn me(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<UserProfile>> {
    let user = crate::db::users::get_by_id(state.pool(), current.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(UserProfile::from(&user)))
}

/// PUT /api/auth/profile
///
/// Partial update of name and/or password. The password changes only
/// when both password fields are present and the current one verifies.
///
/// # Errors
///
/// Returns 400 when the current password is wrong or the new one is too
/// weak.
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireUser(current): RequireUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>> {
    let auth = AuthService::new(state.pool());
    let user = auth
        .update_profile(
            current.id,
            req.name.as_deref(),
            req.current_password.as_deref(),
            req.new_password.as_deref(),
        )
        .await
        .map_err(|e| match e {
            // Wrong current password is a bad request here, not a login failure
            AuthError::InvalidCredentials => {
                ApiError::InvalidRequest("Current password is incorrect".to_owned())
            }
            other => ApiError::Auth(other),
        })?;

    // Keep the session copy of the name fresh
    set_current_user(&session, &CurrentUser::from(&user)).await?;

    Ok(Json(UserProfile::from(&user)))
}
