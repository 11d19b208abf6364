//! Cirrus API Server - JSON surface over the provisioning controller
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - `POST /v1/volumes` for idempotent volume creation
//! - Health and readiness probes

pub mod error;
pub mod handlers;
pub mod response;
pub mod server;
pub mod state;

// Re-export commonly used types
pub use error::{ApiError, Result};
pub use server::{ApiServer, Config};
pub use state::AppState;
