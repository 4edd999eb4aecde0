//! HTTP API for the dashboard UI.
//!
//! - [`server`] - axum router and handlers
//! - [`types`] - request/response types

pub mod server;
pub mod types;
