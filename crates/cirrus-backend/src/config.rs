use crate::error::{BackendError, Result};
use reqwest::Url;
use std::fmt;
use std::time::Duration;

/// Region used when none is configured
pub const DEFAULT_REGION: &str = "RegionOne";

/// Default number of volumes requested per listing page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Connection settings for the Cinder client
#[derive(Clone)]
pub struct CinderConfig {
    /// Versioned Keystone v3 URL (e.g., "https://keystone:5000/v3")
    pub identity_endpoint: String,
    /// User name
    pub username: String,
    /// User password
    pub password: String,
    /// Project (tenant) id the token is scoped to
    pub project_id: String,
    /// Domain of the user
    pub domain_name: String,
    /// Catalog region to pick the volume endpoint from
    pub region: String,
    /// Skip catalog discovery and use this volume endpoint
    pub volume_endpoint: Option<String>,
    /// Volumes requested per listing page
    pub page_size: u32,
    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,
}

impl CinderConfig {
    pub fn new(
        identity_endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        project_id: impl Into<String>,
        domain_name: impl Into<String>,
    ) -> Self {
        Self {
            identity_endpoint: identity_endpoint.into(),
            username: username.into(),
            password: password.into(),
            project_id: project_id.into(),
            domain_name: domain_name.into(),
            region: DEFAULT_REGION.to_string(),
            volume_endpoint: None,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Check the settings before any request is made
    pub fn validate(&self) -> Result<()> {
        parse_http_url(&self.identity_endpoint, "identity endpoint")?;

        if let Some(endpoint) = &self.volume_endpoint {
            parse_http_url(endpoint, "volume endpoint")?;
        }

        for (field, value) in [
            ("username", &self.username),
            ("password", &self.password),
            ("project id", &self.project_id),
            ("domain name", &self.domain_name),
        ] {
            if value.trim().is_empty() {
                return Err(BackendError::invalid_config(
                    format!("{} is empty", field),
                    format!("Set the OpenStack {} (see --help for the matching flag and environment variable)", field),
                ));
            }
        }

        if self.page_size == 0 {
            return Err(BackendError::invalid_config(
                "page size must be greater than zero",
                format!("Use the default of {}", DEFAULT_PAGE_SIZE),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(BackendError::invalid_config(
                "request timeout must be greater than zero",
                "Use a timeout of a few seconds, e.g. 30",
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for CinderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CinderConfig")
            .field("identity_endpoint", &self.identity_endpoint)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("domain_name", &self.domain_name)
            .field("region", &self.region)
            .field("volume_endpoint", &self.volume_endpoint)
            .field("page_size", &self.page_size)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn parse_http_url(raw: &str, what: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| {
        BackendError::invalid_config(
            format!("{} '{}' is not a valid URL: {}", what, raw, e),
            "Use an absolute http:// or https:// URL",
        )
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(BackendError::invalid_config(
            format!("{} '{}' uses unsupported scheme '{}'", what, raw, url.scheme()),
            "Use an absolute http:// or https:// URL",
        ));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CinderConfig {
        CinderConfig::new(
            "http://keystone:5000/v3",
            "admin",
            "secret",
            "f3e1c1a5",
            "Default",
        )
    }

    #[test]
    fn test_defaults() {
        let config = config();
        assert_eq!(config.region, "RegionOne");
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert!(config.volume_endpoint.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_identity_endpoint() {
        let mut config = config();
        config.identity_endpoint = "keystone:5000".to_string();
        assert!(matches!(
            config.validate(),
            Err(BackendError::InvalidConfig { .. })
        ));

        config.identity_endpoint = "ftp://keystone/v3".to_string();
        assert!(matches!(
            config.validate(),
            Err(BackendError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_empty_credentials_rejected() {
        let mut config = config();
        config.password = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let mut config = config();
        config.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
