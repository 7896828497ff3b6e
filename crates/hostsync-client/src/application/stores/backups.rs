//! Backup store.
//!
//! Caches the backend's backup archive plus its aggregate statistics.  The
//! statistics are deliberately second-class: they are loaded best-effort
//! alongside the list and fall back to all-zero on failure instead of
//! failing the caller — an empty stats panel is harmless, an error dialog
//! over it is not.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use hostsync_core::domain::projections;
use hostsync_core::{normalize_backup, normalize_backups, Backup, BackupStats, ReloadSequence};

use crate::application::bridge::BackendBridge;
use crate::application::ops::{safe_async, with_loading_and_reload, LoadingFlag, StoreError};

/// UI-side cache of the backend's backup archive.
pub struct BackupStore {
    bridge: Arc<dyn BackendBridge>,
    cache: RwLock<Vec<Backup>>,
    stats: RwLock<BackupStats>,
    loading: LoadingFlag,
    reloads: ReloadSequence,
}

impl BackupStore {
    pub fn new(bridge: Arc<dyn BackendBridge>) -> Self {
        Self {
            bridge,
            cache: RwLock::new(Vec::new()),
            stats: RwLock::new(BackupStats::default()),
            loading: LoadingFlag::new(),
            reloads: ReloadSequence::new(),
        }
    }

    // ── Reload ───────────────────────────────────────────────────────────────

    /// Replaces the cache with a freshly fetched, normalized backup list and
    /// refreshes the statistics.
    ///
    /// On failure both the cache and the stats reset to empty/zero and the
    /// error propagates; a stale reload discards its result.
    pub async fn load_all(&self) -> Result<(), StoreError> {
        let ticket = self.reloads.begin();
        let _busy = self.loading.enter();

        match self.bridge.get_all_backups().await {
            Ok(raw) => {
                let backups = normalize_backups(&raw);
                if self.reloads.is_current(ticket) {
                    *self.cache.write().await = backups;
                    self.load_stats().await;
                } else {
                    debug!("discarding stale backup reload");
                }
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to load backups");
                if self.reloads.is_current(ticket) {
                    self.cache.write().await.clear();
                    *self.stats.write().await = BackupStats::default();
                }
                Err(e.into())
            }
        }
    }

    /// Refreshes the backend-computed statistics.  Best-effort: a failure is
    /// logged and zeroes the stats, but never propagates.
    pub async fn load_stats(&self) {
        match self.bridge.get_backup_stats().await {
            Ok(raw) => *self.stats.write().await = BackupStats::from_raw(&raw),
            Err(e) => {
                warn!(error = %e, "failed to load backup stats; showing zeroes");
                *self.stats.write().await = BackupStats::default();
            }
        }
    }

    // ── Mutations (reload-after-write) ───────────────────────────────────────

    /// Snapshots the current system hosts file into a manual backup.
    pub async fn create_manual(
        &self,
        description: &str,
        tags: &[String],
    ) -> Result<Backup, StoreError> {
        with_loading_and_reload(
            &self.loading,
            "create manual backup",
            async {
                let raw = self.bridge.create_manual_backup(description, tags).await?;
                normalize_backup(&raw).ok_or(StoreError::MalformedRecord { kind: "backup" })
            },
            || self.load_all(),
        )
        .await
    }

    /// Creates a manual backup from caller-supplied content.
    pub async fn create_manual_with_content(
        &self,
        description: &str,
        content: &str,
        tags: &[String],
    ) -> Result<Backup, StoreError> {
        with_loading_and_reload(
            &self.loading,
            "create manual backup with content",
            async {
                let raw = self
                    .bridge
                    .create_manual_backup_with_content(description, content, tags)
                    .await?;
                normalize_backup(&raw).ok_or(StoreError::MalformedRecord { kind: "backup" })
            },
            || self.load_all(),
        )
        .await
    }

    /// Restores a backup's snapshot to the system hosts file.  The backend
    /// takes an automatic safety backup first, so the list is reloaded.
    pub async fn restore(&self, id: &str) -> Result<(), StoreError> {
        with_loading_and_reload(
            &self.loading,
            "restore backup",
            async { Ok(self.bridge.restore_from_backup(id).await?) },
            || self.load_all(),
        )
        .await
    }

    /// Deletes a backup.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        with_loading_and_reload(
            &self.loading,
            "delete backup",
            async { Ok(self.bridge.delete_backup(id).await?) },
            || self.load_all(),
        )
        .await
    }

    /// Replaces a backup's tag set.  Metadata edits are quick enough that
    /// they skip the loading flag; the reload-after-write rule still holds.
    pub async fn update_tags(&self, id: &str, tags: &[String]) -> Result<(), StoreError> {
        safe_async("update backup tags", async {
            self.bridge.update_backup_tags(id, tags).await?;
            self.load_all().await
        })
        .await
    }

    /// Replaces a backup's description.  Same policy as [`Self::update_tags`].
    pub async fn update_description(&self, id: &str, description: &str) -> Result<(), StoreError> {
        safe_async("update backup description", async {
            self.bridge.update_backup_description(id, description).await?;
            self.load_all().await
        })
        .await
    }

    // ── Read-only views ──────────────────────────────────────────────────────

    /// The cached list, in backend order.
    pub async fn backups(&self) -> Vec<Backup> {
        self.cache.read().await.clone()
    }

    /// The canonical listing: newest first.  Recomputed on every call.
    pub async fn sorted(&self) -> Vec<Backup> {
        projections::sorted_backups(&self.cache.read().await)
    }

    /// Backups the backend took on its own.
    pub async fn automatic(&self) -> Vec<Backup> {
        projections::automatic_backups(&self.cache.read().await)
    }

    /// Backups the user requested explicitly.
    pub async fn manual(&self) -> Vec<Backup> {
        projections::manual_backups(&self.cache.read().await)
    }

    /// The backend-computed statistics from the last (best-effort) load.
    pub async fn stats(&self) -> BackupStats {
        *self.stats.read().await
    }

    /// Statistics recomputed locally from the cache — always consistent with
    /// the list the UI is showing, whatever the backend said.
    pub async fn stats_projection(&self) -> BackupStats {
        projections::backup_stats(&self.cache.read().await)
    }

    /// Whether an operation on this store is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::bridge::{BackendError, MockBackendBridge};
    use serde_json::json;

    fn backup_payload() -> serde_json::Value {
        json!([
            {"id": "b1", "timestamp": "2024-05-02T00:00:00Z", "isAutomatic": true, "size": 100},
            {"id": "b2", "timestamp": "2024-05-03T00:00:00Z", "isAutomatic": false, "size": 50}
        ])
    }

    fn stats_payload() -> serde_json::Value {
        json!({"total": 2, "automatic": 1, "manual": 1, "totalSize": 150})
    }

    #[tokio::test]
    async fn test_load_all_fills_cache_and_stats_together() {
        let mut mock = MockBackendBridge::new();
        mock.expect_get_all_backups().returning(|| Ok(backup_payload()));
        mock.expect_get_backup_stats().returning(|| Ok(stats_payload()));
        let store = BackupStore::new(Arc::new(mock));

        store.load_all().await.unwrap();

        assert_eq!(store.backups().await.len(), 2);
        assert_eq!(store.stats().await.total, 2);
        assert_eq!(store.sorted().await[0].id, "b2", "newest first");
    }

    #[tokio::test]
    async fn test_stats_failure_is_swallowed_with_a_zero_default() {
        let mut mock = MockBackendBridge::new();
        mock.expect_get_all_backups().returning(|| Ok(backup_payload()));
        mock.expect_get_backup_stats()
            .returning(|| Err(BackendError::new("stats table corrupt")));
        let store = BackupStore::new(Arc::new(mock));

        // load_all still succeeds even though the stats call failed.
        store.load_all().await.unwrap();

        assert_eq!(store.backups().await.len(), 2);
        assert_eq!(store.stats().await, BackupStats::default());
        // The local projection remains trustworthy regardless.
        assert_eq!(store.stats_projection().await.total, 2);
    }

    #[tokio::test]
    async fn test_failed_load_all_zeroes_cache_and_stats_and_rethrows() {
        let mut mock = MockBackendBridge::new();
        let mut first = true;
        mock.expect_get_all_backups().returning(move || {
            if first {
                first = false;
                Ok(backup_payload())
            } else {
                Err(BackendError::new("bridge down"))
            }
        });
        mock.expect_get_backup_stats().returning(|| Ok(stats_payload()));
        let store = BackupStore::new(Arc::new(mock));

        store.load_all().await.unwrap();
        let result = store.load_all().await;

        assert!(result.is_err());
        assert!(store.backups().await.is_empty());
        assert_eq!(store.stats().await, BackupStats::default());
    }

    #[tokio::test]
    async fn test_rejected_delete_leaves_cache_untouched() {
        let mut mock = MockBackendBridge::new();
        mock.expect_get_all_backups()
            .times(1)
            .returning(|| Ok(backup_payload()));
        mock.expect_get_backup_stats().returning(|| Ok(stats_payload()));
        mock.expect_delete_backup()
            .returning(|_| Err(BackendError::new("backup is pinned")));
        let store = BackupStore::new(Arc::new(mock));

        store.load_all().await.unwrap();
        let before = store.backups().await;

        assert!(store.delete("b1").await.is_err());
        assert_eq!(store.backups().await, before);
    }

    #[tokio::test]
    async fn test_update_tags_reloads_the_list() {
        let mut mock = MockBackendBridge::new();
        mock.expect_update_backup_tags().returning(|_, _| Ok(()));
        mock.expect_get_all_backups().returning(|| Ok(backup_payload()));
        mock.expect_get_backup_stats().returning(|| Ok(stats_payload()));
        let store = BackupStore::new(Arc::new(mock));

        store
            .update_tags("b1", &["prod".to_string()])
            .await
            .unwrap();

        assert_eq!(store.backups().await.len(), 2, "reload happened");
    }
}
