use crate::error::{BackendError, Result};
use crate::traits::{BlockStorage, VolumeFilter, VolumePager};
use async_trait::async_trait;
use cirrus_core::{VolumeRecord, VolumeSpec};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Scripted failures, shared with live pagers
#[derive(Default)]
struct Faults {
    /// Fail the listing when this page index is requested
    list: Option<(usize, String)>,
    create: Option<String>,
}

/// In-memory block storage for tests and local runs
///
/// Volumes live in a vector in insertion order. Listings ignore the name
/// filter entirely, which makes every caller re-check names the way it must
/// against a real backend. Call counters let tests assert how many remote
/// calls a code path issued.
#[derive(Clone)]
pub struct MockBlockStorage {
    volumes: Arc<RwLock<Vec<VolumeRecord>>>,
    faults: Arc<Mutex<Faults>>,
    page_size: usize,
    create_delay: Option<Duration>,
    create_calls: Arc<AtomicUsize>,
    pages_served: Arc<AtomicUsize>,
}

impl Default for MockBlockStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBlockStorage {
    pub fn new() -> Self {
        Self {
            volumes: Arc::new(RwLock::new(Vec::new())),
            faults: Arc::new(Mutex::new(Faults::default())),
            page_size: 50,
            create_delay: None,
            create_calls: Arc::new(AtomicUsize::new(0)),
            pages_served: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Serve listings `page_size` volumes at a time
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Hold every create call for `delay` before it takes effect
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    /// Add an existing volume
    pub async fn insert(&self, record: VolumeRecord) {
        self.volumes.write().await.push(record);
    }

    /// Snapshot of all stored volumes
    pub async fn volumes(&self) -> Vec<VolumeRecord> {
        self.volumes.read().await.clone()
    }

    /// Number of create calls received, including failed ones
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of listing pages served successfully
    pub fn pages_served(&self) -> usize {
        self.pages_served.load(Ordering::SeqCst)
    }

    /// Fail any listing when it reaches page `page` (0-based)
    pub fn fail_listing_at(&self, page: usize, message: impl Into<String>) {
        self.lock_faults().list = Some((page, message.into()));
    }

    /// Reject every create call with `message`
    pub fn fail_create(&self, message: impl Into<String>) {
        self.lock_faults().create = Some(message.into());
    }

    pub fn clear_faults(&self) {
        *self.lock_faults() = Faults::default();
    }

    fn lock_faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct MockPager {
    storage: MockBlockStorage,
    page: usize,
    done: bool,
}

#[async_trait]
impl VolumePager for MockPager {
    async fn next_page(&mut self) -> Result<Option<Vec<VolumeRecord>>> {
        if self.done {
            return Ok(None);
        }

        let fault = self.storage.lock_faults().list.clone();
        if let Some((at, message)) = fault {
            if at == self.page {
                self.done = true;
                return Err(BackendError::internal(message));
            }
        }

        let volumes = self.storage.volumes.read().await;
        let start = self.page * self.storage.page_size;
        if start >= volumes.len() {
            self.done = true;
            return Ok(None);
        }

        let end = (start + self.storage.page_size).min(volumes.len());
        let page = volumes[start..end].to_vec();
        self.page += 1;
        self.storage.pages_served.fetch_add(1, Ordering::SeqCst);

        debug!("Mock: served listing page {} ({} entries)", self.page, page.len());
        Ok(Some(page))
    }
}

#[async_trait]
impl BlockStorage for MockBlockStorage {
    fn list_volumes(&self, _filter: &VolumeFilter) -> Box<dyn VolumePager> {
        Box::new(MockPager {
            storage: self.clone(),
            page: 0,
            done: false,
        })
    }

    async fn create_volume(&self, spec: &VolumeSpec) -> Result<VolumeRecord> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }

        let fault = self.lock_faults().create.clone();
        if let Some(message) = fault {
            return Err(BackendError::api(400, message));
        }

        let record = VolumeRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name: spec.name.clone(),
            status: "available".to_string(),
            size_gib: spec.size_gib,
            volume_type: spec.volume_type.clone(),
            description: Some(spec.description.clone()),
        };

        self.volumes.write().await.push(record.clone());
        debug!("Mock: created volume {} ({})", record.name, record.id);
        Ok(record)
    }
}
