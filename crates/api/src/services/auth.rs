//! Account service: registration, login and profile updates.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use thiserror::Error;

use marigold_core::{Email, UserId};

use crate::db::{self, RepositoryError};
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] marigold_core::EmailError),

    /// Wrong password or no such user.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Email already has an account.
    #[error("account already registered")]
    AlreadyRegistered,

    /// Password too weak.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

/// Account service.
pub struct AuthService<'a> {
    pool: &'a PgPool,
}

impl<'a> AuthService<'a> {
    /// Create a new account service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Register a new user with name, email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid,
    /// `AuthError::WeakPassword` if the password doesn't meet
    /// requirements and `AuthError::AlreadyRegistered` if the email is
    /// taken.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        db::users::create(self.pool, name.trim(), &email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::AlreadyRegistered,
                other => AuthError::Repository(other),
            })
    }

    /// Log a user in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email or a
    /// wrong password; the two are indistinguishable on purpose.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = db::users::get_by_email(self.pool, &email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &user.password_hash)?;

        Ok(user)
    }

    /// Update the caller's name and/or password.
    ///
    /// A password change requires the current password; the new one is
    /// only accepted when the current one verifies.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the current password is
    /// wrong and `AuthError::WeakPassword` if the new one is too short.
    pub async fn update_profile(
        &self,
        id: UserId,
        name: Option<&str>,
        current_password: Option<&str>,
        new_password: Option<&str>,
    ) -> Result<User, AuthError> {
        let new_hash = match (current_password, new_password) {
            (Some(current), Some(new)) => {
                let user = db::users::get_by_id(self.pool, id)
                    .await?
                    .ok_or(AuthError::InvalidCredentials)?;
                verify_password(current, &user.password_hash)?;
                validate_password(new)?;
                Some(hash_password(new)?)
            }
            _ => None,
        };

        let name = name.map(str::trim).filter(|n| !n.is_empty());

        let user = db::users::update_profile(self.pool, id, name, new_hash.as_deref()).await?;

        Ok(user)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// Public so the CLI can hash admin passwords with the exact same
/// parameters the API verifies against.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::unwrap_used)]
    fn password_hash_round_trips() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(verify_password("wrong password", &hash).is_err());
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn short_passwords_rejected() {
        let err = validate_password("short").unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("repeatable-password");
        let b = hash_password("repeatable-password");
        assert_ne!(
            a.ok().as_deref(),
            b.ok().as_deref(),
            "two hashes of the same password must differ"
        );
    }
}
