//! Cirrus Provisioner - Idempotent create-or-fetch of named volumes
//!
//! This crate provides:
//! - `NameResolver`: exact-name lookup over a lazy, paginated listing
//! - `ProvisioningController`: create-or-reuse with per-name serialization
//! - `NameLocks`: the per-name lock arena
//! - `MountRoot`: the local mount directory kept for every volume

pub mod config;
pub mod controller;
pub mod locks;
pub mod mount;
pub mod resolver;

// Re-export primary types
pub use config::{MismatchPolicy, ProvisionerConfig};
pub use controller::{Outcome, Provisioned, ProvisioningController};
pub use locks::{NameGuard, NameLocks};
pub use mount::MountRoot;
pub use resolver::NameResolver;
