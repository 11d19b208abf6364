// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Protocol-level error code returned to the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Unknown or backend error
    Unknown,
    /// The request itself was malformed
    InvalidArgument,
    /// The referenced volume does not exist
    NotFound,
    /// A volume with this name exists and conflicts with the request
    AlreadyExists,
    /// The caller cancelled before the operation finished
    Cancelled,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unknown => "UNKNOWN",
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for volume provisioning
#[derive(Error, Debug, Diagnostic)]
pub enum ProvisionError {
    /// Request rejected before touching the backend
    #[error("Invalid argument: {message}")]
    #[diagnostic(code(cirrus::invalid_argument), help("{suggestion}"))]
    InvalidArgument {
        #[allow(unused)]
        message: String,
        #[allow(unused)]
        suggestion: String,
    },

    /// Listing volumes on the backend failed
    #[error("Lookup failed for volume '{name}': {message}")]
    #[diagnostic(
        code(cirrus::lookup_failed),
        help("The block-storage service could not be listed. Check that the volume endpoint is reachable and the token is still valid")
    )]
    LookupFailed {
        #[allow(unused)]
        name: String,
        #[allow(unused)]
        message: String,
    },

    /// The backend rejected or failed the create call
    #[error("Failed to create volume '{name}': {message}")]
    #[diagnostic(
        code(cirrus::create_failed),
        help("The backend message is preserved above. Common causes are an exhausted quota or an unknown volume type")
    )]
    CreateFailed {
        #[allow(unused)]
        name: String,
        #[allow(unused)]
        message: String,
    },

    /// The local mount directory could not be created after the backend
    /// volume was created
    #[error("Volume '{name}' was created but its mount directory {path} could not be prepared: {message}")]
    #[diagnostic(
        code(cirrus::local_resource_failed),
        help("The backend volume exists and will be reused on retry. Check permissions on the mount root")
    )]
    LocalResourceFailed {
        #[allow(unused)]
        name: String,
        #[allow(unused)]
        path: String,
        #[allow(unused)]
        message: String,
    },

    /// An existing volume does not match the requested attributes
    #[error("Volume '{name}' already exists as {existing_id} with different attributes: {details}")]
    #[diagnostic(
        code(cirrus::spec_mismatch),
        help("Request the volume with its existing attributes, or choose a different name")
    )]
    SpecMismatch {
        #[allow(unused)]
        name: String,
        #[allow(unused)]
        existing_id: String,
        #[allow(unused)]
        details: String,
    },

    /// The caller cancelled the request between steps
    #[error("Provisioning of volume '{name}' was cancelled")]
    #[diagnostic(
        code(cirrus::cancelled),
        help("Retry the request. A volume created before cancellation is reused")
    )]
    Cancelled {
        #[allow(unused)]
        name: String,
    },
}

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

impl ProvisionError {
    pub fn invalid_argument(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn lookup_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LookupFailed {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn create_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CreateFailed {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn local_resource_failed(
        name: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::LocalResourceFailed {
            name: name.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn spec_mismatch(
        name: impl Into<String>,
        existing_id: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self::SpecMismatch {
            name: name.into(),
            existing_id: existing_id.into(),
            details: details.into(),
        }
    }

    pub fn cancelled(name: impl Into<String>) -> Self {
        Self::Cancelled { name: name.into() }
    }

    /// Protocol error code for this failure
    pub fn code(&self) -> ErrorCode {
        match self {
            ProvisionError::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            ProvisionError::SpecMismatch { .. } => ErrorCode::AlreadyExists,
            ProvisionError::Cancelled { .. } => ErrorCode::Cancelled,
            ProvisionError::LookupFailed { .. }
            | ProvisionError::CreateFailed { .. }
            | ProvisionError::LocalResourceFailed { .. } => ErrorCode::Unknown,
        }
    }
}
