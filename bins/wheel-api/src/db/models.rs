//! Database models for the prize wheel service.

use chrono::{DateTime, Utc};

/// Database row for a platform user.
///
/// Created on first verified-contact event, updated on repeat contact,
/// never deleted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,

    /// Platform user id (unique).
    pub telegram_user_id: i64,

    /// Verified phone number. Absence gates all spin and state access.
    pub phone: Option<String>,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Whether a usable phone number is on file.
    pub fn has_phone(&self) -> bool {
        self.phone.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// Fields for creating or refreshing a user record.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub telegram_user_id: i64,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

/// Database row for a catalog prize. Read-only from the engine's
/// perspective.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PrizeRow {
    pub id: i32,

    pub name: String,

    /// Category tag: free_days, bonus, discount, free_month, merch.
    #[sqlx(rename = "type")]
    pub kind: String,

    /// Monetary/benefit value copied into the spin at draw time.
    pub value: f64,

    pub probability_weight: i32,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,
}

/// A committed spin joined with its prize's display attributes.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SpinHistoryRow {
    pub id: i64,
    pub user_id: i64,
    pub prize_id: i32,

    /// Value realized at draw time, not a live reference to the prize.
    pub result_value: f64,

    /// Anonymized origin tag; never the raw address.
    pub ip_hash: Option<String>,

    pub created_at: DateTime<Utc>,

    pub prize_name: String,
    pub prize_kind: String,
}
