//! Student notification relay server library
//!
//! Exports the modules used by the server binary and by the integration tests:
//! the QR hand-off registry and pairing gateway, scan URL sessions, and the
//! HTTP/WebSocket surface around them.

pub mod api_contract;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod routes;
pub mod services;

// Re-export commonly used types for convenience
pub use config::AppSettings;
pub use error::AppError;
