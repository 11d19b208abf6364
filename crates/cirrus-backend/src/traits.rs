use crate::error::Result;
use async_trait::async_trait;
use cirrus_core::{VolumeRecord, VolumeSpec};

/// Server-side filter for volume listings
///
/// Backends apply this filter on a best-effort basis. Callers that need an
/// exact match must re-check every returned record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeFilter {
    pub name: Option<String>,
}

impl VolumeFilter {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

/// Lazy, forward-only sequence of volume pages
///
/// Each call to `next_page` fetches at most one page from the backend.
/// `Ok(None)` marks the end of the listing; a pager is not restartable.
#[async_trait]
pub trait VolumePager: Send {
    async fn next_page(&mut self) -> Result<Option<Vec<VolumeRecord>>>;
}

/// Authenticated handle to a remote block-storage service
///
/// The production implementation is `CinderClient`. `MockBlockStorage`
/// keeps volumes in memory for tests.
#[async_trait]
pub trait BlockStorage: Send + Sync {
    /// Start a listing of volumes matching `filter`. No request is issued
    /// until the first page is pulled.
    fn list_volumes(&self, filter: &VolumeFilter) -> Box<dyn VolumePager>;

    /// Create a volume. The backend does not enforce name uniqueness.
    async fn create_volume(&self, spec: &VolumeSpec) -> Result<VolumeRecord>;
}
