//! REST API routes for the prize wheel service.

use axum::Router;
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};

use super::handlers::{
    AppState, auth, health_check, roulette_config, roulette_history, roulette_spin, user_me,
};

/// Create the REST API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Public endpoints
        .route("/api/auth", post(auth))
        .route("/api/roulette/config", get(roulette_config))
        // Protected endpoints (init data via header)
        .route("/api/user/me", get(user_me))
        .route("/api/user/state", get(user_me))
        .route("/api/roulette/spin", post(roulette_spin))
        .route("/api/roulette/history", get(roulette_history))
        // Mini-app web views are served from a different origin
        .layer(middleware::from_fn(cors))
        .with_state(state)
}

async fn cors(req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(response.headers_mut());
        return response;
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    response
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization, X-Telegram-Init-Data"),
    );
}
