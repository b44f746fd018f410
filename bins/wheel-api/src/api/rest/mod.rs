//! REST API modules.

pub mod handlers;
pub mod routes;
pub mod types;

pub use routes::create_router;
