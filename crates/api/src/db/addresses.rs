//! Database operations for saved addresses.
//!
//! The default flag is maintained with a reset-then-set pattern inside a
//! transaction: clearing every default for the user before marking the
//! new one keeps the partial unique index satisfied without ever racing
//! a second writer into two defaults.

use sqlx::PgPool;

use marigold_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::{Address, AddressForm};

/// List a user's addresses, default first, then newest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list_for_user(pool: &PgPool, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
    let addresses = sqlx::query_as::<_, Address>(
        r"
        SELECT id, user_id, full_name, phone, line1, line2, city, state,
               postal_code, country, is_default, created_at, updated_at
        FROM addresses
        WHERE user_id = $1
        ORDER BY is_default DESC, created_at DESC
        ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(addresses)
}

/// Get one of a user's addresses by id.
///
/// Scoped to the owner, so this doubles as the ownership check for
/// update and delete, and as the resolver order reads use to look up the
/// shipping address an order row points at.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get(
    pool: &PgPool,
    user_id: UserId,
    id: AddressId,
) -> Result<Option<Address>, RepositoryError> {
    let address = sqlx::query_as::<_, Address>(
        r"
        SELECT id, user_id, full_name, phone, line1, line2, city, state,
               postal_code, country, is_default, created_at, updated_at
        FROM addresses
        WHERE id = $1 AND user_id = $2
        ",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(address)
}

/// Fetch a batch of addresses by id, without owner scoping.
///
/// Admin order listings span users, so this resolves ids across the
/// whole table. Deleted addresses are simply absent from the result.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_many(
    pool: &PgPool,
    ids: &[AddressId],
) -> Result<Vec<Address>, RepositoryError> {
    let raw_ids: Vec<i32> = ids.iter().copied().map(i32::from).collect();

    let addresses = sqlx::query_as::<_, Address>(
        r"
        SELECT id, user_id, full_name, phone, line1, line2, city, state,
               postal_code, country, is_default, created_at, updated_at
        FROM addresses
        WHERE id = ANY($1)
        ",
    )
    .bind(raw_ids)
    .fetch_all(pool)
    .await?;

    Ok(addresses)
}

/// Create a new address for a user.
///
/// The first address a user saves becomes their default regardless of
/// the flag in the form. An explicit default demotes the previous one.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any statement fails.
pub async fn create(
    pool: &PgPool,
    user_id: UserId,
    form: &AddressForm,
) -> Result<Address, RepositoryError> {
    let mut tx = pool.begin().await?;

    let (existing,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM addresses WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

    let is_default = form.is_default || existing == 0;
    if is_default {
        sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    let address = sqlx::query_as::<_, Address>(
        r"
        INSERT INTO addresses
            (user_id, full_name, phone, line1, line2, city, state,
             postal_code, country, is_default)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id, user_id, full_name, phone, line1, line2, city, state,
                  postal_code, country, is_default, created_at, updated_at
        ",
    )
    .bind(user_id)
    .bind(&form.full_name)
    .bind(&form.phone)
    .bind(&form.line1)
    .bind(&form.line2)
    .bind(&form.city)
    .bind(&form.state)
    .bind(&form.postal_code)
    .bind(&form.country)
    .bind(is_default)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(address)
}

/// Replace one of a user's addresses.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the address doesn't exist or
/// belongs to someone else.
pub async fn update(
    pool: &PgPool,
    user_id: UserId,
    id: AddressId,
    form: &AddressForm,
) -> Result<Address, RepositoryError> {
    let mut tx = pool.begin().await?;

    if form.is_default {
        sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    let address = sqlx::query_as::<_, Address>(
        r"
        UPDATE addresses
        SET full_name = $3, phone = $4, line1 = $5, line2 = $6, city = $7,
            state = $8, postal_code = $9, country = $10,
            is_default = is_default OR $11,
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, full_name, phone, line1, line2, city, state,
                  postal_code, country, is_default, created_at, updated_at
        ",
    )
    .bind(id)
    .bind(user_id)
    .bind(&form.full_name)
    .bind(&form.phone)
    .bind(&form.line1)
    .bind(&form.line2)
    .bind(&form.city)
    .bind(&form.state)
    .bind(&form.postal_code)
    .bind(&form.country)
    .bind(form.is_default)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    tx.commit().await?;

    Ok(address)
}

/// Delete one of a user's addresses.
///
/// Historical orders keep their bare `address_id`; reads resolve the
/// gap to `null`.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the address doesn't exist or
/// belongs to someone else.
pub async fn delete(pool: &PgPool, user_id: UserId, id: AddressId) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}

/// Mark one of a user's addresses as the default.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the address doesn't exist or
/// belongs to someone else (the transaction rolls the reset back).
pub async fn set_default(
    pool: &PgPool,
    user_id: UserId,
    id: AddressId,
) -> Result<Address, RepositoryError> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let address = sqlx::query_as::<_, Address>(
        r"
        UPDATE addresses
        SET is_default = TRUE, updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, full_name, phone, line1, line2, city, state,
                  postal_code, country, is_default, created_at, updated_at
        ",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    tx.commit().await?;

    Ok(address)
}
