use miette::Diagnostic;
use thiserror::Error;

/// Error type for block-storage backend operations
#[derive(Error, Debug, Diagnostic)]
pub enum BackendError {
    /// The request never produced an HTTP response
    #[error("Transport error: {message}")]
    #[diagnostic(
        code(cirrus::backend::transport),
        help("Check network connectivity to the OpenStack endpoints and the configured request timeout")
    )]
    Transport {
        #[allow(unused)]
        message: String,
    },

    /// The service answered with a non-success status
    #[error("Block-storage API returned {status}: {message}")]
    #[diagnostic(code(cirrus::backend::api_error))]
    Api {
        #[allow(unused)]
        status: u16,
        #[allow(unused)]
        message: String,
    },

    /// The response body did not have the expected shape
    #[error("Failed to decode response: {message}")]
    #[diagnostic(
        code(cirrus::backend::decode_error),
        help("The endpoint may not be a Cinder v2/v3 API. Verify the volume endpoint")
    )]
    Decode {
        #[allow(unused)]
        message: String,
    },

    /// Keystone rejected the credentials or returned no token
    #[error("Authentication against {endpoint} failed: {message}")]
    #[diagnostic(
        code(cirrus::backend::authentication_failed),
        help("Verify the username, password, user domain and project id. The identity endpoint must be the versioned v3 URL (e.g. https://keystone:5000/v3)")
    )]
    AuthenticationFailed {
        #[allow(unused)]
        endpoint: String,
        #[allow(unused)]
        message: String,
    },

    /// No block-storage endpoint in the service catalog
    #[error("No block-storage endpoint for region '{region}' in the service catalog")]
    #[diagnostic(
        code(cirrus::backend::endpoint_not_found),
        help("Looked for service types {service_types}. Set the region, or pass the volume endpoint explicitly")
    )]
    EndpointNotFound {
        #[allow(unused)]
        region: String,
        #[allow(unused)]
        service_types: String,
    },

    /// Invalid client configuration
    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(cirrus::backend::invalid_config), help("{suggestion}"))]
    InvalidConfig {
        #[allow(unused)]
        message: String,
        #[allow(unused)]
        suggestion: String,
    },

    /// Scripted or otherwise unclassified backend failure
    #[error("Backend error: {message}")]
    #[diagnostic(code(cirrus::backend::internal_error))]
    Internal {
        #[allow(unused)]
        message: String,
    },
}

/// Result type alias for backend operations
pub type Result<T> = std::result::Result<T, BackendError>;

impl BackendError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn authentication_failed(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn endpoint_not_found(region: impl Into<String>, service_types: &[&str]) -> Self {
        Self::EndpointNotFound {
            region: region.into(),
            service_types: service_types.join(", "),
        }
    }

    pub fn invalid_config(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::decode(err.to_string())
        } else {
            BackendError::transport(err.to_string())
        }
    }
}
