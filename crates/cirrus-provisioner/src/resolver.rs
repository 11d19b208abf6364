use cirrus_backend::{BlockStorage, Result, VolumeFilter};
use cirrus_core::VolumeRecord;
use std::sync::Arc;
use tracing::debug;

/// Finds the volume carrying an exact name
///
/// The backend filters by name on a best-effort basis and does not keep
/// names unique, so every candidate is re-checked and the first exact match
/// wins.
pub struct NameResolver {
    backend: Arc<dyn BlockStorage>,
}

impl NameResolver {
    pub fn new(backend: Arc<dyn BlockStorage>) -> Self {
        Self { backend }
    }

    /// Return the first volume named exactly `name`, or `None`.
    ///
    /// Pages are pulled one at a time and no page is fetched after a match.
    /// A failed page aborts the lookup with that error.
    pub async fn resolve(&self, name: &str) -> Result<Option<VolumeRecord>> {
        let mut pager = self.backend.list_volumes(&VolumeFilter::by_name(name));
        let mut pages = 0usize;

        while let Some(page) = pager.next_page().await? {
            pages += 1;
            if let Some(found) = page.into_iter().find(|v| v.name == name) {
                debug!(
                    "Resolved volume '{}' to {} after {} page(s)",
                    name, found.id, pages
                );
                return Ok(Some(found));
            }
        }

        debug!("No volume named '{}' in {} page(s)", name, pages);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_backend::MockBlockStorage;

    fn record(id: &str, name: &str) -> VolumeRecord {
        VolumeRecord {
            id: id.to_string(),
            name: name.to_string(),
            status: "available".to_string(),
            size_gib: 1,
            volume_type: None,
            description: None,
        }
    }

    async fn storage_with(page_size: usize, volumes: &[(&str, &str)]) -> Arc<MockBlockStorage> {
        let storage = Arc::new(MockBlockStorage::new().with_page_size(page_size));
        for (id, name) in volumes {
            storage.insert(record(id, name)).await;
        }
        storage
    }

    #[tokio::test]
    async fn test_resolve_skips_non_matching_names() {
        let storage = storage_with(10, &[("old", "x-old"), ("c1", "vol-c")]).await;
        let resolver = NameResolver::new(storage);

        let found = resolver.resolve("vol-c").await.unwrap().unwrap();
        assert_eq!(found.id, "c1");
        assert_eq!(found.name, "vol-c");
    }

    #[tokio::test]
    async fn test_resolve_rejects_prefix_matches() {
        let storage = storage_with(10, &[("1", "vol-c-2"), ("2", "vol")]).await;
        let resolver = NameResolver::new(storage);

        assert!(resolver.resolve("vol-c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_returns_first_of_duplicates() {
        let storage = storage_with(10, &[("first", "dup"), ("second", "dup")]).await;
        let resolver = NameResolver::new(storage);

        assert_eq!(resolver.resolve("dup").await.unwrap().unwrap().id, "first");
    }

    #[tokio::test]
    async fn test_resolve_stops_at_first_match() {
        let storage = storage_with(
            2,
            &[("1", "a"), ("2", "b"), ("3", "target"), ("4", "c"), ("5", "d"), ("6", "e")],
        )
        .await;
        let resolver = NameResolver::new(storage.clone());

        let found = resolver.resolve("target").await.unwrap().unwrap();
        assert_eq!(found.id, "3");
        assert_eq!(storage.pages_served(), 2);
    }

    #[tokio::test]
    async fn test_resolve_walks_every_page_when_absent() {
        let storage = storage_with(2, &[("1", "a"), ("2", "b"), ("3", "c")]).await;
        let resolver = NameResolver::new(storage.clone());

        assert!(resolver.resolve("missing").await.unwrap().is_none());
        assert_eq!(storage.pages_served(), 2);
    }

    #[tokio::test]
    async fn test_resolve_error_is_not_absence() {
        let storage = storage_with(1, &[("1", "a"), ("2", "b")]).await;
        storage.fail_listing_at(1, "gateway timeout");
        let resolver = NameResolver::new(storage);

        let err = resolver.resolve("b").await.unwrap_err();
        assert!(err.to_string().contains("gateway timeout"));
    }

    #[tokio::test]
    async fn test_resolve_match_before_failing_page() {
        let storage = storage_with(1, &[("1", "a"), ("2", "b")]).await;
        storage.fail_listing_at(1, "gateway timeout");
        let resolver = NameResolver::new(storage);

        assert_eq!(resolver.resolve("a").await.unwrap().unwrap().id, "1");
    }
}
