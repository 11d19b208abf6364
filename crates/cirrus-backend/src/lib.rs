//! Cirrus Backend - Block-storage client abstraction
//!
//! This crate provides:
//! - `BlockStorage` and `VolumePager` traits consumed by the provisioner
//! - An OpenStack Cinder v2 client authenticated through Keystone v3
//! - `MockBlockStorage`, an in-memory backend for tests and local runs

// Allow unused assignments for diagnostic fields - they're used by the thiserror/miette macros
#![allow(unused_assignments)]

pub mod cinder;
pub mod config;
pub mod error;
pub mod mock;
pub mod traits;

// Re-export primary types
pub use cinder::CinderClient;
pub use config::CinderConfig;
pub use error::{BackendError, Result};
pub use mock::MockBlockStorage;
pub use traits::{BlockStorage, VolumeFilter, VolumePager};
