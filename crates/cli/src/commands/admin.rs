//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create (or promote) an admin account
//! marigold-cli create-admin -e admin@example.com -n "Admin Name"
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `ADMIN_PASSWORD` - password for the account; when unset a random
//!   one is generated and printed once

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use marigold_api::services::auth::hash_password;
use marigold_core::Email;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Password hashing failed.
    #[error("Failed to hash password")]
    Hash,
}

/// Create an admin user, or promote an existing account.
///
/// The upsert keys on email: an existing user gets the new name and
/// password and the admin flag; a fresh row is created otherwise.
///
/// # Errors
///
/// Returns `AdminError` if the email is malformed, `DATABASE_URL` is
/// unset, or the database write fails.
pub async fn create_admin(email: &str, name: &str) -> Result<(), AdminError> {
    dotenvy::dotenv().ok();

    let email = Email::parse(email).map_err(|e| AdminError::InvalidEmail(e.to_string()))?;

    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| AdminError::MissingEnvVar("DATABASE_URL"))?;

    let (password, generated) = match std::env::var("ADMIN_PASSWORD") {
        Ok(password) => (password, false),
        Err(_) => (Uuid::new_v4().simple().to_string(), true),
    };

    let password_hash = hash_password(&password).map_err(|_| AdminError::Hash)?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Creating admin user: {}", email);

    let (user_id,): (i32,) = sqlx::query_as(
        r"
        INSERT INTO users (name, email, password_hash, is_admin)
        VALUES ($1, $2, $3, TRUE)
        ON CONFLICT (email) DO UPDATE
        SET name = EXCLUDED.name,
            password_hash = EXCLUDED.password_hash,
            is_admin = TRUE,
            updated_at = NOW()
        RETURNING id
        ",
    )
    .bind(name)
    .bind(&email)
    .bind(&password_hash)
    .fetch_one(&pool)
    .await?;

    tracing::info!("Admin user ready! ID: {}, Email: {}", user_id, email);

    if generated {
        #[allow(clippy::print_stdout)]
        {
            println!("Generated password for {email}: {password}");
            println!("Store it now; it is not shown again.");
        }
    }

    Ok(())
}
