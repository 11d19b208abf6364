use cirrus_provisioner::ProvisioningController;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<ProvisioningController>,

    /// Cancelled on shutdown; every request runs under a child token
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(controller: Arc<ProvisioningController>, shutdown: CancellationToken) -> Self {
        Self {
            controller,
            shutdown,
        }
    }
}
