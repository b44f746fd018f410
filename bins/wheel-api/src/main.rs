//! Prize wheel API service.
//!
//! Validates mini-app init data, arbitrates quota-guarded prize draws,
//! and fans out best-effort admin notifications.

use std::sync::Arc;

use tracing::{error, info};

use wheel_api::api::rest::handlers::AppState;
use wheel_api::api::rest::create_router;
use wheel_api::config::Config;
use wheel_api::db;
use wheel_api::engine::{SpinEngine, SystemRandom};
use wheel_api::notify::{AdminNotifier, BotApi, Notifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting prize wheel API...");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    info!(
        "Configuration loaded: port {}, spin limit {}",
        config.api_port, config.spin_limit
    );

    // Connect to database and run migrations
    let pool = db::create_pool(&config.database_url).await?;

    // Admin notifications are optional; the spin path works without them
    let notifier: Option<Arc<dyn AdminNotifier>> = if config.admin_chat_id != 0 {
        Some(Arc::new(Notifier::new(
            BotApi::new(config.bot_token.clone()),
            config.admin_chat_id,
        )))
    } else {
        info!("Admin notifications disabled (ADMIN_CHAT_ID not set)");
        None
    };

    let engine = SpinEngine::new(pool.clone(), config.spin_limit, Arc::new(SystemRandom));

    let state = AppState {
        pool,
        config: config.clone(),
        engine,
        notifier,
    };

    let app = create_router(state);

    let addr = config.api_addr();
    info!("REST API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
