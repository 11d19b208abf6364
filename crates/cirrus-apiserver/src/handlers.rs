use crate::response::ApiResponse;
use crate::{ApiError, AppState, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cirrus_core::CreateVolumeRequest;
use cirrus_provisioner::Outcome;
use std::sync::Arc;
use tracing::info;

/// POST /v1/volumes
pub async fn create_volume(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<CreateVolumeRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = body.map_err(ApiError::from)?;
    info!("CreateVolume request for '{}'", request.name);

    let cancel = state.shutdown.child_token();

    let provisioned = state.controller.create_volume(request, &cancel).await?;

    let response = match provisioned.outcome {
        Outcome::Created => ApiResponse::created(provisioned.record),
        Outcome::Exists => ApiResponse::ok(provisioned.record),
    };
    Ok(response.into_response())
}

/// Health check endpoint
pub async fn healthz() -> &'static str {
    "ok"
}

/// Readiness probe
pub async fn readyz() -> &'static str {
    "ok"
}
