//! Cirrus Core - Fundamental types for the Cirrus volume provisioner
//!
//! This crate provides:
//! - The volume data model shared by the backend client and the controller
//! - Inbound request types and volume name validation
//! - The provisioning error taxonomy with miette diagnostics

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{ErrorCode, ProvisionError, Result};
pub use types::{
    is_valid_volume_name, CreateVolumeRequest, VolumeRecord, VolumeSpec, MAX_VOLUME_NAME_LEN,
    VTYPE_PARAM,
};
