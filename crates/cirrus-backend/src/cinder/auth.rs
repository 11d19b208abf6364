use super::wire::{fault_message, AuthRequest, CatalogEntry, TokenResponse};
use crate::config::CinderConfig;
use crate::error::{BackendError, Result};
use reqwest::Client;
use tracing::{debug, info};

const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Token and service catalog obtained from Keystone
pub(crate) struct Session {
    pub token: String,
    pub catalog: Vec<CatalogEntry>,
}

/// Password authentication against Keystone v3, scoped to the project
pub(crate) async fn authenticate(http: &Client, config: &CinderConfig) -> Result<Session> {
    let url = format!(
        "{}/auth/tokens",
        config.identity_endpoint.trim_end_matches('/')
    );
    info!(
        user = %config.username,
        project = %config.project_id,
        "Authenticating against {}", url
    );

    let body = AuthRequest::password(
        &config.username,
        &config.domain_name,
        &config.password,
        &config.project_id,
    );

    let resp = http
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|e| BackendError::authentication_failed(&config.identity_endpoint, e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(BackendError::authentication_failed(
            &config.identity_endpoint,
            format!("status {}: {}", status, fault_message(&text)),
        ));
    }

    let token = resp
        .headers()
        .get(SUBJECT_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| {
            BackendError::authentication_failed(
                &config.identity_endpoint,
                "response carried no X-Subject-Token header",
            )
        })?;

    let body: TokenResponse = resp
        .json()
        .await
        .map_err(|e| BackendError::decode(format!("invalid token response: {}", e)))?;

    debug!(
        "Keystone returned a catalog with {} services",
        body.token.catalog.len()
    );

    Ok(Session {
        token,
        catalog: body.token.catalog,
    })
}
