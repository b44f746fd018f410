//! Error types for init-data validation.
//!
//! Display strings deliberately carry no payload detail: the raw
//! signature, the shared secret, and the data-check string must never
//! reach a log line through these errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("init data or bot token is empty")]
    Empty,

    #[error("missing hash field")]
    MissingHash,

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("missing auth_date field")]
    MissingAuthDate,

    #[error("malformed auth_date field")]
    MalformedAuthDate,

    #[error("init data expired")]
    Expired,

    #[error("malformed user descriptor")]
    MalformedUser,
}
