//! REST API request/response types for the prize wheel service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{PrizeRow, SpinHistoryRow, UserRow};
use crate::engine::SpinOutcome;

/// Body of `POST /api/auth`.
#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    /// Raw init-data payload handed to the web view by the chat client.
    #[serde(rename = "initData")]
    pub init_data: String,
}

/// Authenticated user as exposed to the mini app.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i64,
    pub telegram_user_id: i64,
    pub phone: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
}

impl From<UserRow> for UserDto {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            telegram_user_id: row.telegram_user_id,
            phone: row.phone.unwrap_or_default(),
            first_name: row.first_name.unwrap_or_default(),
            last_name: row.last_name.unwrap_or_default(),
            username: row.username.unwrap_or_default(),
        }
    }
}

/// Spin quota state for the authenticated user.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserStateDto {
    pub spin_available: bool,
    pub spins_used: i64,
    pub spin_limit: i64,
}

/// Response of `POST /api/auth` and the user endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserDto,
    pub state: UserStateDto,
}

/// One catalog prize.
#[derive(Debug, Serialize, Deserialize)]
pub struct PrizeDto {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: f64,
    pub weight: i32,
}

impl From<PrizeRow> for PrizeDto {
    fn from(row: PrizeRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            kind: row.kind,
            value: row.value,
            weight: row.probability_weight,
        }
    }
}

/// Response of `GET /api/roulette/config`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogResponse {
    pub prizes: Vec<PrizeDto>,
}

/// One committed spin.
#[derive(Debug, Serialize, Deserialize)]
pub struct SpinDto {
    pub id: i64,
    pub prize_id: i32,
    pub prize_name: String,
    #[serde(rename = "prize_type")]
    pub prize_kind: String,
    pub value: f64,
    pub created_at: DateTime<Utc>,
}

impl From<SpinOutcome> for SpinDto {
    fn from(outcome: SpinOutcome) -> Self {
        Self {
            id: outcome.id,
            prize_id: outcome.prize_id,
            prize_name: outcome.prize_name,
            prize_kind: outcome.prize_kind,
            value: outcome.value,
            created_at: outcome.created_at,
        }
    }
}

/// Response of `POST /api/roulette/spin`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SpinResponse {
    pub spin: SpinDto,
}

/// One history entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistorySpinDto {
    pub id: i64,
    pub prize_name: String,
    #[serde(rename = "prize_type")]
    pub prize_kind: String,
    pub value: f64,
    pub created_at: String,
}

impl From<SpinHistoryRow> for HistorySpinDto {
    fn from(row: SpinHistoryRow) -> Self {
        Self {
            id: row.id,
            prize_name: row.prize_name,
            prize_kind: row.prize_kind,
            value: row.result_value,
            created_at: row.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Response of `GET /api/roulette/history`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<HistorySpinDto>,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
