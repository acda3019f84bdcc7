//! Database operations for user accounts.

use sqlx::PgPool;

use marigold_core::{Email, UserId};

use super::RepositoryError;
use crate::models::User;

/// Create a new user.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the email already exists.
pub async fn create(
    pool: &PgPool,
    name: &str,
    email: &Email,
    password_hash: &str,
) -> Result<User, RepositoryError> {
    sqlx::query_as::<_, User>(
        r"
        INSERT INTO users (name, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING id, name, email, password_hash, is_admin, created_at, updated_at
        ",
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await
    .map_err(|e| RepositoryError::from_sqlx(e, "email already exists"))
}

/// Get a user by email.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_by_email(pool: &PgPool, email: &Email) -> Result<Option<User>, RepositoryError> {
    let user = sqlx::query_as::<_, User>(
        r"
        SELECT id, name, email, password_hash, is_admin, created_at, updated_at
        FROM users
        WHERE email = $1
        ",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Get a user by id.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_by_id(pool: &PgPool, id: UserId) -> Result<Option<User>, RepositoryError> {
    let user = sqlx::query_as::<_, User>(
        r"
        SELECT id, name, email, password_hash, is_admin, created_at, updated_at
        FROM users
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Partially update a user's profile.
///
/// `None` fields are left untouched.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the user doesn't exist.
pub async fn update_profile(
    pool: &PgPool,
    id: UserId,
    name: Option<&str>,
    password_hash: Option<&str>,
) -> Result<User, RepositoryError> {
    sqlx::query_as::<_, User>(
        r"
        UPDATE users
        SET name = COALESCE($2, name),
            password_hash = COALESCE($3, password_hash),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, name, email, password_hash, is_admin, created_at, updated_at
        ",
    )
    .bind(id)
    .bind(name)
    .bind(password_hash)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Admin edit of a user: rename, re-email, or toggle the admin flag.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the user doesn't exist and
/// `RepositoryError::Conflict` if the new email is taken.
pub async fn admin_update(
    pool: &PgPool,
    id: UserId,
    name: Option<&str>,
    email: Option<&Email>,
    is_admin: Option<bool>,
) -> Result<User, RepositoryError> {
    sqlx::query_as::<_, User>(
        r"
        UPDATE users
        SET name = COALESCE($2, name),
            email = COALESCE($3, email),
            is_admin = COALESCE($4, is_admin),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, name, email, password_hash, is_admin, created_at, updated_at
        ",
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(is_admin)
    .fetch_optional(pool)
    .await
    .map_err(|e| RepositoryError::from_sqlx(e, "email already exists"))?
    .ok_or(RepositoryError::NotFound)
}

/// List every registered user, newest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_all(pool: &PgPool) -> Result<Vec<User>, RepositoryError> {
    let users = sqlx::query_as::<_, User>(
        r"
        SELECT id, name, email, password_hash, is_admin, created_at, updated_at
        FROM users
        ORDER BY created_at DESC
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(users)
}

/// Every registered email address (newsletter audience).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn all_emails(pool: &PgPool) -> Result<Vec<Email>, RepositoryError> {
    let rows: Vec<(Email,)> = sqlx::query_as("SELECT email FROM users ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|(email,)| email).collect())
}

/// Delete a user.
///
/// Cart and addresses cascade; orders RESTRICT, so a user with order
/// history cannot be deleted.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the user doesn't exist and
/// `RepositoryError::Conflict` if order rows still reference them.
pub async fn delete(pool: &PgPool, id: UserId) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::Conflict(
                    "user has order history and cannot be deleted".to_owned(),
                );
            }
            RepositoryError::Database(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}

/// Total registered users (dashboard stat).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count(pool: &PgPool) -> Result<i64, RepositoryError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    Ok(count)
}
