//! Best-effort admin notifications.
//!
//! Delivery is fire-and-forget: failures are logged and swallowed,
//! never surfaced to the spin request that triggered them. The caller
//! dispatches through `tokio::spawn`, so cancelling the triggering
//! request does not cancel the notification.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::db::UserRow;

/// Group chat ids below this magnitude may have been migrated to the
/// supergroup shape by the platform.
const SUPERGROUP_FLOOR: i64 = -1_000_000_000_000;

/// Notification delivery error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The platform rejected the message; carries its description.
    #[error("telegram api error: {0}")]
    Api(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Message delivery transport.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), NotifyError>;
}

/// Telegram Bot API transport.
pub struct BotApi {
    http: reqwest::Client,
    token: String,
}

impl BotApi {
    pub fn new(token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: String,
}

#[async_trait]
impl Transport for BotApi {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            // without_url: the request URL embeds the bot token.
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;

        let reply: ApiReply = response
            .json()
            .await
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;

        if !reply.ok {
            return Err(NotifyError::Api(reply.description));
        }
        Ok(())
    }
}

/// Capability consumed by the spin handler; any transport that can
/// deliver a spin announcement implements this.
#[async_trait]
pub trait AdminNotifier: Send + Sync {
    async fn notify_spin(&self, user: &UserRow, prize_name: &str);
}

/// Sends plain-text messages to one configured destination chat, with
/// a derived supergroup-id fallback.
pub struct Notifier<T = BotApi> {
    transport: T,
    chat_id: i64,
}

impl<T: Transport> Notifier<T> {
    pub fn new(transport: T, chat_id: i64) -> Self {
        Self { transport, chat_id }
    }

    /// Deliver `text`, trying each candidate chat id in order.
    ///
    /// Moves to the next candidate only on "destination reshaped"
    /// errors; any other error, or exhausting the candidates, logs and
    /// gives up. Never returns an error to the caller.
    pub async fn notify(&self, text: &str) {
        if self.chat_id == 0 {
            return;
        }

        let candidates = candidate_chat_ids(self.chat_id);
        for (idx, chat_id) in candidates.iter().copied().enumerate() {
            match self.transport.send_message(chat_id, text).await {
                Ok(()) => {
                    if chat_id != self.chat_id {
                        info!(
                            chat_id,
                            configured = self.chat_id,
                            "notification delivered via fallback chat id"
                        );
                    }
                    return;
                }
                Err(err) if idx + 1 < candidates.len() && is_reshaped_chat_error(&err) => {
                    warn!(chat_id, %err, "retrying notification with fallback chat id");
                }
                Err(err) => {
                    error!(chat_id, %err, "admin notification failed");
                    return;
                }
            }
        }
    }

    /// Like [`notify`](Self::notify) with a local timestamp line
    /// appended to the message body.
    pub async fn notify_with_time(&self, text: &str) {
        let stamp = chrono::Local::now().format("%d.%m.%Y %H:%M");
        self.notify(&format!("{text}\nВремя: {stamp}")).await;
    }
}

#[async_trait]
impl<T: Transport> AdminNotifier for Notifier<T> {
    async fn notify_spin(&self, user: &UserRow, prize_name: &str) {
        let phone = user.phone.as_deref().unwrap_or("—");
        let text = format!("🎰 Новый спин!\nНомер: {phone}\nЧто выиграл: {prize_name}");
        self.notify_with_time(&text).await;
    }
}

/// Candidate destination ids for one configured id: the id itself,
/// plus the supergroup derivation (`-100` prefixed to the magnitude)
/// for group-style negative ids.
fn candidate_chat_ids(chat_id: i64) -> Vec<i64> {
    let mut ids = vec![chat_id];
    if chat_id < 0 && chat_id > SUPERGROUP_FLOOR {
        if let Ok(supergroup_id) = format!("-100{}", -chat_id).parse::<i64>() {
            ids.push(supergroup_id);
        }
    }
    ids
}

/// Whether a delivery error means the destination chat was migrated to
/// a different identifier shape.
fn is_reshaped_chat_error(err: &NotifyError) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("chat not found")
        || msg.contains("group chat was upgraded to a supergroup chat")
        || msg.contains("chat was upgraded to a supergroup")
}
