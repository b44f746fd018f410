//! Prize wheel service library exports.
//!
//! Re-exports internal components for the binary and for integration
//! testing.

pub mod api;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod notify;
