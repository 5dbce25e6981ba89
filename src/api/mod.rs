//! HTTP surface: axum router, endpoint handlers, error mapping, and
//! server lifecycle.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;
