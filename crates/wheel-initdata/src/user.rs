//! User descriptor embedded in Telegram WebApp init data.

use serde::Deserialize;

/// The `user` JSON object carried inside a validated init-data payload.
///
/// Only `id` is guaranteed by the platform; every other field defaults
/// to empty/false when absent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebAppUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub language_code: String,
    #[serde(default)]
    pub is_premium: bool,
}
