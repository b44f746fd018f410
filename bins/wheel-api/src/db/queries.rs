//! Database queries for the prize wheel service.
//!
//! The spin insert itself lives in the engine because it must run
//! inside the advisory-locked transaction; everything here is a plain
//! pool-level read or upsert.

use sqlx::PgPool;

use crate::db::models::{NewUser, PrizeRow, SpinHistoryRow, UserRow};
use crate::error::Result;

/// Get a user by their platform user id.
pub async fn get_user_by_telegram_id(
    pool: &PgPool,
    telegram_user_id: i64,
) -> Result<Option<UserRow>> {
    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE telegram_user_id = $1")
        .bind(telegram_user_id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Insert a user or refresh their contact fields on repeat contact.
///
/// A known phone number is never erased by an upsert that carries none.
pub async fn upsert_user(pool: &PgPool, user: &NewUser) -> Result<UserRow> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (telegram_user_id, phone, first_name, last_name, username)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (telegram_user_id) DO UPDATE SET
            phone = COALESCE(EXCLUDED.phone, users.phone),
            first_name = EXCLUDED.first_name,
            last_name = EXCLUDED.last_name,
            username = EXCLUDED.username,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(user.telegram_user_id)
    .bind(&user.phone)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.username)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Count committed spins for a user.
///
/// Advisory only outside a transaction: the engine re-counts under the
/// per-user lock before inserting.
pub async fn count_spins_by_user(pool: &PgPool, user_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM spins WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// List all active prizes in stable id order.
///
/// Includes prizes excluded from random draws; callers decide
/// display-only versus awardable use.
pub async fn list_active_prizes(pool: &PgPool) -> Result<Vec<PrizeRow>> {
    let prizes = sqlx::query_as::<_, PrizeRow>(
        r#"
        SELECT id, name, type, value, probability_weight, is_active, created_at
        FROM prizes WHERE is_active = true ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(prizes)
}

/// List a user's most recent spins joined with prize attributes,
/// newest first.
pub async fn list_spins_by_user(
    pool: &PgPool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<SpinHistoryRow>> {
    let limit = if limit <= 0 { 10 } else { limit };
    let spins = sqlx::query_as::<_, SpinHistoryRow>(
        r#"
        SELECT s.id, s.user_id, s.prize_id, s.result_value, s.ip_hash, s.created_at,
               p.name AS prize_name, p.type AS prize_kind
        FROM spins s
        JOIN prizes p ON p.id = s.prize_id
        WHERE s.user_id = $1
        ORDER BY s.created_at DESC, s.id DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(spins)
}
