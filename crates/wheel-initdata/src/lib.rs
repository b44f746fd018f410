//! Stateless validation of Telegram WebApp init data.
//!
//! A web view launched from the chat client hands the frontend a signed,
//! URL-encoded payload asserting who the user is. This crate verifies
//! that payload against the bot token with no network round trip, per
//! <https://core.telegram.org/bots/webapps#validating-data-received-via-the-mini-app>:
//!
//! 1. strip the `hash` field,
//! 2. sort the remaining `key=value` pairs and join them with `\n`,
//! 3. `secret = HMAC-SHA256(key = "WebAppData", msg = bot_token)`,
//! 4. require `hash == HMAC-SHA256(key = secret, msg = joined_pairs)`,
//!    compared in constant time,
//! 5. require `auth_date` to be no older than 24 hours.
//!
//! Every failure is fail-closed: a payload is either fully trusted or
//! rejected outright.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;

mod error;
mod user;

pub use error::Error;
pub use user::WebAppUser;

type HmacSha256 = Hmac<Sha256>;

/// Domain-separation key for the stage-1 HMAC, fixed by the platform.
const DOMAIN_KEY: &[u8] = b"WebAppData";

/// Maximum accepted age of a payload's `auth_date`.
const MAX_AGE_SECS: i64 = 24 * 60 * 60;

/// Validates an init-data payload against the bot token.
///
/// Returns `Ok(Some(user))` for a valid payload carrying a user
/// descriptor, `Ok(None)` for a valid but anonymous payload (callers
/// must reject those at a higher layer), and `Err(_)` for anything that
/// fails verification.
pub fn validate(init_data: &str, bot_token: &str) -> Result<Option<WebAppUser>, Error> {
    // A pre-epoch clock reads as 0 rather than panicking.
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    validate_at(init_data, bot_token, now)
}

/// Validates against an explicit clock. Pure function of its inputs.
pub fn validate_at(
    init_data: &str,
    bot_token: &str,
    now_unix: i64,
) -> Result<Option<WebAppUser>, Error> {
    if init_data.is_empty() || bot_token.is_empty() {
        return Err(Error::Empty);
    }

    // First occurrence wins for duplicate keys; BTreeMap gives the
    // lexicographic iteration order the data-check string requires.
    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(init_data.as_bytes()) {
        fields
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }

    let provided = fields.remove("hash").ok_or(Error::MissingHash)?;
    let provided = hex::decode(provided.as_bytes()).map_err(|_| Error::SignatureMismatch)?;

    let data_check_string = fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut secret =
        HmacSha256::new_from_slice(DOMAIN_KEY).expect("HMAC accepts keys of any length");
    secret.update(bot_token.as_bytes());
    let secret = secret.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&secret).expect("HMAC accepts keys of any length");
    mac.update(data_check_string.as_bytes());
    // Constant-time comparison; a wrong-length hash fails the same way.
    mac.verify_slice(&provided)
        .map_err(|_| Error::SignatureMismatch)?;

    let auth_date = fields.get("auth_date").ok_or(Error::MissingAuthDate)?;
    let auth_date: i64 = auth_date.parse().map_err(|_| Error::MalformedAuthDate)?;
    if now_unix.saturating_sub(auth_date) > MAX_AGE_SECS {
        return Err(Error::Expired);
    }

    match fields.get("user") {
        None => Ok(None),
        Some(raw) => serde_json::from_str(raw)
            .map(Some)
            .map_err(|_| Error::MalformedUser),
    }
}
