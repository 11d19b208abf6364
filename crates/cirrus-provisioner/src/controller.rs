use crate::config::{MismatchPolicy, ProvisionerConfig};
use crate::locks::NameLocks;
use crate::mount::MountRoot;
use crate::resolver::NameResolver;
use cirrus_backend::BlockStorage;
use cirrus_core::{
    is_valid_volume_name, CreateVolumeRequest, ProvisionError, Result, VolumeRecord, VolumeSpec,
    MAX_VOLUME_NAME_LEN,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a provision call was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A new backend volume was created
    Created,
    /// An existing volume with the same name was returned
    Exists,
}

/// Result of a successful provision call
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub record: VolumeRecord,
    pub outcome: Outcome,
}

/// Idempotent create-or-fetch of named volumes
///
/// Lookups run unserialized. Creates take a per-name guard and look the name
/// up again under it, so concurrent requests for one name issue at most one
/// backend create while different names proceed in parallel.
pub struct ProvisioningController {
    backend: Arc<dyn BlockStorage>,
    resolver: NameResolver,
    locks: NameLocks,
    mounts: Option<MountRoot>,
    config: ProvisionerConfig,
}

impl ProvisioningController {
    pub fn new(backend: Arc<dyn BlockStorage>, config: ProvisionerConfig) -> Self {
        Self {
            resolver: NameResolver::new(backend.clone()),
            backend,
            locks: NameLocks::new(),
            mounts: config.mount_root.clone().map(MountRoot::new),
            config,
        }
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    /// Names with a create currently in flight
    pub fn pending_creates(&self) -> usize {
        self.locks.len()
    }

    /// Build the spec for an inbound request from the configured policy
    pub fn spec_for(&self, req: &CreateVolumeRequest) -> VolumeSpec {
        VolumeSpec::new(req.name.clone(), self.config.default_size_gib)
            .with_volume_type(req.volume_type())
            .with_description(self.config.description.clone())
    }

    /// Handle an inbound CreateVolume request
    pub async fn create_volume(
        &self,
        req: CreateVolumeRequest,
        cancel: &CancellationToken,
    ) -> Result<Provisioned> {
        let spec = self.spec_for(&req);
        self.provision(spec, cancel).await
    }

    /// Return the volume named `spec.name`, creating it if it does not exist
    pub async fn provision(
        &self,
        spec: VolumeSpec,
        cancel: &CancellationToken,
    ) -> Result<Provisioned> {
        validate_spec(&spec)?;
        check_cancelled(cancel, &spec.name)?;

        if let Some(existing) = self.lookup(&spec.name).await? {
            return self.reuse(&spec, existing, cancel).await;
        }

        let _guard = tokio::select! {
            guard = self.locks.lock(&spec.name) => guard,
            _ = cancel.cancelled() => {
                debug!("Request for volume '{}' cancelled while waiting for its lock", spec.name);
                return Err(ProvisionError::cancelled(&spec.name));
            }
        };
        check_cancelled(cancel, &spec.name)?;

        // Another request may have created it while we waited
        if let Some(existing) = self.lookup(&spec.name).await? {
            debug!("Volume '{}' appeared while waiting for its lock", spec.name);
            return self.reuse(&spec, existing, cancel).await;
        }

        check_cancelled(cancel, &spec.name)?;

        let record = self
            .backend
            .create_volume(&spec)
            .await
            .map_err(|e| ProvisionError::create_failed(&spec.name, e.to_string()))?;

        info!(
            "Created volume '{}' as {} ({} GiB, type {})",
            record.name,
            record.id,
            record.size_gib,
            record.volume_type.as_deref().unwrap_or("default")
        );

        if cancel.is_cancelled() {
            warn!(
                "Request for volume '{}' cancelled after backend create; {} will be reused on retry",
                spec.name, record.id
            );
            return Err(ProvisionError::cancelled(&spec.name));
        }

        self.ensure_mount(&record).await?;

        Ok(Provisioned {
            record,
            outcome: Outcome::Created,
        })
    }

    async fn lookup(&self, name: &str) -> Result<Option<VolumeRecord>> {
        self.resolver
            .resolve(name)
            .await
            .map_err(|e| ProvisionError::lookup_failed(name, e.to_string()))
    }

    /// Return an existing volume, after the mismatch check and the local step
    async fn reuse(
        &self,
        spec: &VolumeSpec,
        existing: VolumeRecord,
        cancel: &CancellationToken,
    ) -> Result<Provisioned> {
        let diffs = existing.differences(spec);
        if !diffs.is_empty() {
            let details = diffs.join("; ");
            match self.config.mismatch_policy {
                MismatchPolicy::Ignore => warn!(
                    "Reusing volume '{}' ({}) despite differing attributes: {}",
                    existing.name, existing.id, details
                ),
                MismatchPolicy::Reject => {
                    return Err(ProvisionError::spec_mismatch(
                        &existing.name,
                        &existing.id,
                        details,
                    ))
                }
            }
        }

        check_cancelled(cancel, &spec.name)?;

        // A previous attempt may have failed after the backend create
        self.ensure_mount(&existing).await?;

        debug!("Volume '{}' already exists as {}", existing.name, existing.id);
        Ok(Provisioned {
            record: existing,
            outcome: Outcome::Exists,
        })
    }

    async fn ensure_mount(&self, record: &VolumeRecord) -> Result<()> {
        let Some(mounts) = &self.mounts else {
            return Ok(());
        };

        mounts.ensure(&record.name).await.map(|_| ()).map_err(|e| {
            ProvisionError::local_resource_failed(
                &record.name,
                mounts.path_for(&record.name).display().to_string(),
                e.to_string(),
            )
        })
    }
}

fn validate_spec(spec: &VolumeSpec) -> Result<()> {
    if !is_valid_volume_name(&spec.name) {
        return Err(ProvisionError::invalid_argument(
            format!("invalid volume name '{}'", spec.name),
            format!(
                "Names must be 1-{} characters and must not contain '/', '\\' or be '.' or '..'",
                MAX_VOLUME_NAME_LEN
            ),
        ));
    }

    if spec.size_gib == 0 {
        return Err(ProvisionError::invalid_argument(
            "volume size must be at least 1 GiB",
            "Configure a positive default size",
        ));
    }

    Ok(())
}

fn check_cancelled(cancel: &CancellationToken, name: &str) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(ProvisionError::cancelled(name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_backend::MockBlockStorage;
    use cirrus_core::ErrorCode;
    use futures_util::future::join_all;
    use std::time::Duration;
    use tempfile::tempdir;

    fn record(id: &str, name: &str) -> VolumeRecord {
        VolumeRecord {
            id: id.to_string(),
            name: name.to_string(),
            status: "available".to_string(),
            size_gib: 1,
            volume_type: None,
            description: Some("CSI Volume".to_string()),
        }
    }

    fn controller(storage: &Arc<MockBlockStorage>) -> ProvisioningController {
        ProvisioningController::new(storage.clone(), ProvisionerConfig::default())
    }

    #[tokio::test]
    async fn test_existing_volume_is_reused() {
        let storage = Arc::new(MockBlockStorage::new());
        storage.insert(record("id-a", "vol-a")).await;
        let controller = controller(&storage);

        let req = CreateVolumeRequest::new("vol-a").with_parameter("vtype", "slow");
        let result = controller
            .create_volume(req, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.outcome, Outcome::Exists);
        assert_eq!(result.record, record("id-a", "vol-a"));
        assert_eq!(storage.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_fresh_volume_is_created() {
        let storage = Arc::new(MockBlockStorage::new());
        let controller = controller(&storage);

        let req = CreateVolumeRequest::new("vol-b").with_parameter("vtype", "fast");
        let result = controller
            .create_volume(req, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.outcome, Outcome::Created);
        assert_eq!(result.record.name, "vol-b");
        assert_eq!(result.record.size_gib, 1);
        assert_eq!(result.record.volume_type.as_deref(), Some("fast"));
        assert_eq!(result.record.description.as_deref(), Some("CSI Volume"));
        assert_eq!(storage.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_back_to_back_requests_are_idempotent() {
        let storage = Arc::new(MockBlockStorage::new());
        let controller = controller(&storage);
        let cancel = CancellationToken::new();

        let first = controller
            .create_volume(CreateVolumeRequest::new("vol-b"), &cancel)
            .await
            .unwrap();
        let second = controller
            .create_volume(CreateVolumeRequest::new("vol-b"), &cancel)
            .await
            .unwrap();

        assert_eq!(first.outcome, Outcome::Created);
        assert_eq!(second.outcome, Outcome::Exists);
        assert_eq!(first.record, second.record);
        assert_eq!(storage.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_same_name_creates_once() {
        let storage = Arc::new(
            MockBlockStorage::new().with_create_delay(Duration::from_millis(20)),
        );
        let controller = Arc::new(controller(&storage));

        let calls = (0..8).map(|_| {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller
                    .create_volume(CreateVolumeRequest::new("vol-c"), &CancellationToken::new())
                    .await
            })
        });
        let results: Vec<Provisioned> = join_all(calls)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();

        assert_eq!(storage.create_calls(), 1);
        let id = &results[0].record.id;
        assert!(results.iter().all(|r| &r.record.id == id));
        assert_eq!(
            results.iter().filter(|r| r.outcome == Outcome::Created).count(),
            1
        );
        assert_eq!(storage.volumes().await.len(), 1);
        assert_eq!(controller.pending_creates(), 0);
    }

    #[tokio::test]
    async fn test_different_names_create_in_parallel() {
        let storage = Arc::new(
            MockBlockStorage::new().with_create_delay(Duration::from_millis(200)),
        );
        let controller = Arc::new(controller(&storage));

        let started = std::time::Instant::now();
        let calls = (0..4).map(|i| {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller
                    .create_volume(
                        CreateVolumeRequest::new(format!("vol-{}", i)),
                        &CancellationToken::new(),
                    )
                    .await
            })
        });
        for result in join_all(calls).await {
            assert_eq!(result.unwrap().unwrap().outcome, Outcome::Created);
        }

        // Serialized creates would take at least 800ms
        assert!(started.elapsed() < Duration::from_millis(700));
        assert_eq!(storage.create_calls(), 4);
        assert_eq!(controller.pending_creates(), 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_issues_no_create() {
        let storage = Arc::new(MockBlockStorage::new());
        storage.fail_listing_at(0, "503 Service Unavailable");
        let controller = controller(&storage);

        let err = controller
            .create_volume(CreateVolumeRequest::new("vol-d"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::LookupFailed { .. }));
        assert_eq!(err.code(), ErrorCode::Unknown);
        assert_eq!(storage.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_create_failure_keeps_backend_message() {
        let storage = Arc::new(MockBlockStorage::new());
        storage.fail_create("VolumeLimitExceeded: Maximum number of volumes allowed (10) exceeded");
        let controller = controller(&storage);

        let err = controller
            .create_volume(CreateVolumeRequest::new("vol-e"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::CreateFailed { .. }));
        assert!(err
            .to_string()
            .contains("VolumeLimitExceeded: Maximum number of volumes allowed (10) exceeded"));
        assert!(storage.volumes().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_name_rejected_before_backend() {
        let storage = Arc::new(MockBlockStorage::new());
        let controller = controller(&storage);

        for name in ["", "..", "a/b"] {
            let err = controller
                .create_volume(CreateVolumeRequest::new(name), &CancellationToken::new())
                .await
                .unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidArgument);
        }
        assert_eq!(storage.pages_served(), 0);
        assert_eq!(storage.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_request_issues_no_create() {
        let storage = Arc::new(MockBlockStorage::new());
        let controller = controller(&storage);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = controller
            .create_volume(CreateVolumeRequest::new("vol-f"), &cancel)
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::Cancelled);
        assert_eq!(storage.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_create_reports_cancelled_and_retry_reuses() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(
            MockBlockStorage::new().with_create_delay(Duration::from_millis(50)),
        );
        let controller = Arc::new(ProvisioningController::new(
            storage.clone(),
            ProvisionerConfig {
                mount_root: Some(dir.path().to_path_buf()),
                ..Default::default()
            },
        ));
        let cancel = CancellationToken::new();

        let task = {
            let controller = controller.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                controller
                    .create_volume(CreateVolumeRequest::new("vol-g"), &cancel)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err.code(), ErrorCode::Cancelled);
        assert_eq!(storage.create_calls(), 1);
        assert!(!dir.path().join("vol-g").exists());

        let retry = controller
            .create_volume(CreateVolumeRequest::new("vol-g"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(retry.outcome, Outcome::Exists);
        assert_eq!(storage.create_calls(), 1);
        assert!(dir.path().join("vol-g").is_dir());
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_lock() {
        let storage = Arc::new(
            MockBlockStorage::new().with_create_delay(Duration::from_millis(500)),
        );
        let controller = Arc::new(controller(&storage));

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller
                    .create_volume(CreateVolumeRequest::new("vol-x"), &CancellationToken::new())
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let cancel = CancellationToken::new();
        let second = {
            let controller = controller.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                controller
                    .create_volume(CreateVolumeRequest::new("vol-x"), &cancel)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let err = tokio::time::timeout(Duration::from_millis(200), second)
            .await
            .expect("cancelled waiter should return before the create finishes")
            .unwrap()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Cancelled);

        let created = first.await.unwrap().unwrap();
        assert_eq!(created.outcome, Outcome::Created);

        // Only the initial lookups ran, both against an empty listing
        assert_eq!(storage.pages_served(), 0);
        assert_eq!(storage.create_calls(), 1);
        assert_eq!(controller.pending_creates(), 0);
    }

    #[tokio::test]
    async fn test_mount_directory_created() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(MockBlockStorage::new());
        let controller = ProvisioningController::new(
            storage.clone(),
            ProvisionerConfig {
                mount_root: Some(dir.path().to_path_buf()),
                ..Default::default()
            },
        );

        controller
            .create_volume(CreateVolumeRequest::new("vol-h"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(dir.path().join("vol-h").is_dir());
    }

    #[tokio::test]
    async fn test_local_failure_is_recoverable_on_retry() {
        let dir = tempdir().unwrap();
        let mount_root = dir.path().join("mounts");
        let storage = Arc::new(MockBlockStorage::new());
        let controller = ProvisioningController::new(
            storage.clone(),
            ProvisionerConfig {
                mount_root: Some(mount_root.clone()),
                ..Default::default()
            },
        );
        let cancel = CancellationToken::new();

        // Mount root missing: backend create succeeds, local step fails
        let err = controller
            .create_volume(CreateVolumeRequest::new("vol-i"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::LocalResourceFailed { .. }));
        assert_eq!(storage.volumes().await.len(), 1);

        std::fs::create_dir(&mount_root).unwrap();
        let retry = controller
            .create_volume(CreateVolumeRequest::new("vol-i"), &cancel)
            .await
            .unwrap();

        assert_eq!(retry.outcome, Outcome::Exists);
        assert_eq!(retry.record.id, storage.volumes().await[0].id);
        assert_eq!(storage.create_calls(), 1);
        assert!(mount_root.join("vol-i").is_dir());
    }

    #[tokio::test]
    async fn test_mismatch_ignored_by_default() {
        let storage = Arc::new(MockBlockStorage::new());
        let mut existing = record("id-j", "vol-j");
        existing.size_gib = 10;
        storage.insert(existing.clone()).await;
        let controller = controller(&storage);

        let result = controller
            .create_volume(CreateVolumeRequest::new("vol-j"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.outcome, Outcome::Exists);
        assert_eq!(result.record, existing);
    }

    #[tokio::test]
    async fn test_mismatch_rejected_when_configured() {
        let storage = Arc::new(MockBlockStorage::new());
        let mut existing = record("id-k", "vol-k");
        existing.volume_type = Some("slow".to_string());
        storage.insert(existing).await;
        let controller = ProvisioningController::new(
            storage.clone(),
            ProvisionerConfig {
                mismatch_policy: MismatchPolicy::Reject,
                ..Default::default()
            },
        );

        let req = CreateVolumeRequest::new("vol-k").with_parameter("vtype", "fast");
        let err = controller
            .create_volume(req, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::AlreadyExists);
        assert!(err.to_string().contains("id-k"));
        assert_eq!(storage.create_calls(), 0);

        // A matching request still succeeds
        let req = CreateVolumeRequest::new("vol-k").with_parameter("vtype", "slow");
        assert!(controller
            .create_volume(req, &CancellationToken::new())
            .await
            .is_ok());
    }

    #[test]
    fn test_spec_for_applies_policy() {
        let storage = Arc::new(MockBlockStorage::new());
        let controller = ProvisioningController::new(
            storage,
            ProvisionerConfig {
                default_size_gib: 5,
                description: "managed".to_string(),
                ..Default::default()
            },
        );

        let spec = controller.spec_for(
            &CreateVolumeRequest::new("vol-l")
                .with_parameter("vtype", "fast")
                .with_parameter("fsType", "ext4"),
        );

        assert_eq!(spec.name, "vol-l");
        assert_eq!(spec.size_gib, 5);
        assert_eq!(spec.volume_type.as_deref(), Some("fast"));
        assert_eq!(spec.description, "managed");
    }
}
