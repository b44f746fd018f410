//! Configuration for the prize wheel service.

use std::env;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bot token: shared secret for init-data validation and the
    /// notification transport.
    pub bot_token: String,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Port for the REST API server.
    pub api_port: u16,

    /// Maximum committed spins per user.
    pub spin_limit: i64,

    /// Destination chat for admin notifications. 0 disables them.
    pub admin_chat_id: i64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `BOT_TOKEN`: bot token issued by the chat platform
    /// - `DATABASE_URL`: PostgreSQL connection string
    ///
    /// Optional:
    /// - `API_PORT`: REST API port (default: 8080)
    /// - `SPIN_LIMIT_PER_USER`: per-user spin quota (default: 1)
    /// - `ADMIN_CHAT_ID`: notification destination (default: 0, disabled)
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = env::var("BOT_TOKEN").map_err(|_| ConfigError::MissingEnv("BOT_TOKEN"))?;

        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        let spin_limit = env::var("SPIN_LIMIT_PER_USER")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        let admin_chat_id = env::var("ADMIN_CHAT_ID")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        Ok(Self {
            bot_token,
            database_url,
            api_port,
            spin_limit,
            admin_chat_id,
        })
    }

    /// REST API bind address.
    pub fn api_addr(&self) -> std::net::SocketAddr {
        ([0, 0, 0, 0], self.api_port).into()
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnv(&'static str),
}
