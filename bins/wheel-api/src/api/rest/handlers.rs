//! REST API handlers for the prize wheel service.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::error;

use crate::api::rest::types::*;
use crate::config::Config;
use crate::db::{self, UserRow};
use crate::engine::SpinEngine;
use crate::error::{ApiError, Result};
use crate::notify::AdminNotifier;

/// How many history entries the mini app shows.
const HISTORY_LIMIT: i64 = 10;

/// Shared state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub engine: SpinEngine,
    pub notifier: Option<Arc<dyn AdminNotifier>>,
}

/// Health check endpoint.
///
/// # Endpoint
/// `GET /health`
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Authenticate a mini-app session.
///
/// # Endpoint
/// `POST /api/auth`
///
/// # Request Body
/// `{"initData": "..."}` — the signed payload from the web-view bridge.
///
/// # Verification Steps
/// 1. Validates the init-data signature and freshness (fails closed)
/// 2. Requires an embedded user descriptor (anonymous payloads are rejected)
/// 3. Resolves the internal user; a user without a phone on file is blocked
///    until the contact-sharing flow completes
///
/// # Returns
/// - `200 OK` with user + spin quota state
/// - `400 Bad Request` when `initData` is missing
/// - `401 Unauthorized` for invalid or anonymous payloads
/// - `403 Forbidden` when no phone is on file
pub async fn auth(
    State(state): State<AppState>,
    Json(req): Json<AuthRequest>,
) -> Result<Json<AuthResponse>> {
    if req.init_data.is_empty() {
        return Err(ApiError::BadRequest("initData required".to_string()));
    }
    let user = resolve_user(&state, &req.init_data).await?;
    user_with_state(&state, user).await
}

/// Authenticated user + quota state.
///
/// # Endpoint
/// `GET /api/user/me` and `GET /api/user/state`
pub async fn user_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AuthResponse>> {
    let user = authenticate(&state, &headers).await?;
    user_with_state(&state, user).await
}

/// Perform the user's prize draw.
///
/// # Endpoint
/// `POST /api/roulette/spin`
///
/// # Returns
/// - `200 OK` with the committed spin joined with prize attributes
/// - `401 Unauthorized` / `403 Forbidden` as for the other protected routes
/// - `409 Conflict` when the per-user quota is already consumed
pub async fn roulette_spin(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SpinResponse>> {
    let user = authenticate(&state, &headers).await?;

    let ip_hash = hash_ip(client_ip(&headers).unwrap_or_default());

    let outcome = state.engine.spin(user.id, &ip_hash).await.map_err(|err| {
        if !matches!(err, ApiError::QuotaExceeded) {
            error!(
                user_id = user.id,
                telegram_user_id = user.telegram_user_id,
                %err,
                "spin failed"
            );
        }
        err
    })?;

    // Fire-and-forget: a detached task, so cancellation of this request
    // never cancels the notification, and delivery failures never
    // affect the response.
    if let Some(notifier) = state.notifier.clone() {
        let user = user.clone();
        let prize_name = outcome.prize_name.clone();
        tokio::spawn(async move {
            notifier.notify_spin(&user, &prize_name).await;
        });
    }

    Ok(Json(SpinResponse {
        spin: outcome.into(),
    }))
}

/// Public prize catalog.
///
/// # Endpoint
/// `GET /api/roulette/config`
///
/// Returns every active prize in stable order, including rows excluded
/// from random draws — the wheel displays them even though the engine
/// never awards them.
pub async fn roulette_config(State(state): State<AppState>) -> Result<Json<CatalogResponse>> {
    let prizes = state.engine.catalog().await?;
    Ok(Json(CatalogResponse {
        prizes: prizes.into_iter().map(Into::into).collect(),
    }))
}

/// The user's recent spins, newest first.
///
/// # Endpoint
/// `GET /api/roulette/history`
pub async fn roulette_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<HistoryResponse>> {
    let user = authenticate(&state, &headers).await?;
    let spins = state.engine.history(user.id, HISTORY_LIMIT).await?;
    Ok(Json(HistoryResponse {
        history: spins.into_iter().map(Into::into).collect(),
    }))
}

/// Build the user + quota state response shared by auth and user routes.
async fn user_with_state(state: &AppState, user: UserRow) -> Result<Json<AuthResponse>> {
    let spins_used = db::count_spins_by_user(&state.pool, user.id).await?;
    let spin_limit = state.engine.spin_limit();
    Ok(Json(AuthResponse {
        user: user.into(),
        state: UserStateDto {
            spin_available: spins_used < spin_limit,
            spins_used,
            spin_limit,
        },
    }))
}

/// Authenticate a protected request from its headers.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<UserRow> {
    let init_data = extract_init_data(headers).ok_or(ApiError::Unauthorized)?;
    resolve_user(state, &init_data).await
}

/// Validate an init-data payload and resolve the phone-verified user.
async fn resolve_user(state: &AppState, init_data: &str) -> Result<UserRow> {
    let web_user = wheel_initdata::validate(init_data, &state.config.bot_token)?
        // Valid payload without a user descriptor: treat as anonymous.
        .ok_or(ApiError::Unauthorized)?;

    let user = db::get_user_by_telegram_id(&state.pool, web_user.id)
        .await?
        .ok_or(ApiError::PhoneRequired)?;
    if !user.has_phone() {
        return Err(ApiError::PhoneRequired);
    }
    Ok(user)
}

/// Pull the init-data payload from the dedicated header, or from
/// `Authorization: Bearer` for compatibility.
fn extract_init_data(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get("x-telegram-init-data")
        .and_then(|v| v.to_str().ok())
        && !value.is_empty()
    {
        return Some(value.to_string());
    }
    if let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        && !token.is_empty()
    {
        return Some(token.to_string());
    }
    None
}

/// First forwarded client address, if any.
fn client_ip(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Anonymized origin tag: SHA-256 hex of the port-stripped address.
/// The raw address is never stored or logged.
fn hash_ip(ip: &str) -> String {
    if ip.is_empty() {
        return String::new();
    }
    let mut ip = ip;
    // IPv4 with port: strip the port.
    if let Some(idx) = ip.rfind(':')
        && idx > 0
        && ip.contains('.')
    {
        ip = &ip[..idx];
    }
    hex::encode(Sha256::digest(ip.as_bytes()))
}
