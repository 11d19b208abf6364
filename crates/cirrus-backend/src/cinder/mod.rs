mod auth;
mod pager;
pub mod wire;

pub use pager::CinderVolumePager;

use crate::config::CinderConfig;
use crate::error::{BackendError, Result};
use crate::traits::{BlockStorage, VolumeFilter, VolumePager};
use async_trait::async_trait;
use cirrus_core::{VolumeRecord, VolumeSpec};
use reqwest::{Client, Response};
use tracing::{debug, info};
use wire::{fault_message, select_endpoint, CreateVolumeBody, VolumeEnvelope};

pub(crate) const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Catalog service types for the block-storage API, in order of preference
pub const VOLUME_SERVICE_TYPES: &[&str] = &["volumev2", "volumev3", "block-storage"];

/// OpenStack Cinder client
///
/// Authenticates once in `connect` and then issues every request with the
/// same token. The client is cheap to clone.
#[derive(Clone)]
pub struct CinderClient {
    http: Client,
    token: String,
    endpoint: String,
    page_size: u32,
}

impl CinderClient {
    /// Validate the configuration, authenticate, and resolve the volume
    /// endpoint.
    pub async fn connect(config: CinderConfig) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                BackendError::invalid_config(
                    format!("failed to build HTTP client: {}", e),
                    "Check the system TLS configuration",
                )
            })?;

        let session = auth::authenticate(&http, &config).await?;

        let endpoint = match &config.volume_endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => select_endpoint(&session.catalog, VOLUME_SERVICE_TYPES, &config.region)
                .ok_or_else(|| {
                    BackendError::endpoint_not_found(&config.region, VOLUME_SERVICE_TYPES)
                })?,
        };

        info!(
            "Connected to block storage at {} (region {})",
            endpoint, config.region
        );

        Ok(Self {
            http,
            token: session.token,
            endpoint,
            page_size: config.page_size,
        })
    }

    /// The volume endpoint requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BlockStorage for CinderClient {
    fn list_volumes(&self, filter: &VolumeFilter) -> Box<dyn VolumePager> {
        let url = format!("{}/volumes/detail", self.endpoint);
        let mut query = vec![("limit".to_string(), self.page_size.to_string())];
        if let Some(name) = &filter.name {
            query.push(("name".to_string(), name.clone()));
        }

        Box::new(CinderVolumePager::new(
            self.http.clone(),
            self.token.clone(),
            url,
            query,
        ))
    }

    async fn create_volume(&self, spec: &VolumeSpec) -> Result<VolumeRecord> {
        let url = format!("{}/volumes", self.endpoint);
        debug!("POST {} (name={}, size={})", url, spec.name, spec.size_gib);

        let resp = self
            .http
            .post(&url)
            .header(AUTH_TOKEN_HEADER, self.token.as_str())
            .json(&CreateVolumeBody::from(spec))
            .send()
            .await?;
        let resp = check_response(resp).await?;

        let envelope: VolumeEnvelope = resp.json().await?;
        Ok(envelope.volume.into())
    }
}

/// Turn a non-success response into `BackendError::Api`, keeping the
/// service's fault message
pub(crate) async fn check_response(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let mut message = fault_message(&body);
    if message.is_empty() {
        message = status
            .canonical_reason()
            .unwrap_or("empty response body")
            .to_string();
    }

    Err(BackendError::api(status.as_u16(), message))
}
