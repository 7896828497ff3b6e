//! Configuration store.
//!
//! Caches the saved hosts configurations and exposes the actions the UI
//! performs on them.  The "apply" transition — moving the active flag from
//! one configuration to another — is observed only through the post-apply
//! reload, which is what makes it look atomic to the UI: the cache never
//! holds an intermediate two-active or zero-active state of its own making.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error};

use hostsync_core::domain::projections;
use hostsync_core::{normalize_configuration, normalize_configurations, Configuration, ReloadSequence};

use crate::application::bridge::BackendBridge;
use crate::application::ops::{
    safe_async, with_loading, with_loading_and_reload, LoadingFlag, StoreError,
};

/// UI-side cache of the backend's configuration list.
pub struct ConfigStore {
    bridge: Arc<dyn BackendBridge>,
    cache: RwLock<Vec<Configuration>>,
    loading: LoadingFlag,
    reloads: ReloadSequence,
    system_hosts_path: RwLock<Option<String>>,
}

impl ConfigStore {
    pub fn new(bridge: Arc<dyn BackendBridge>) -> Self {
        Self {
            bridge,
            cache: RwLock::new(Vec::new()),
            loading: LoadingFlag::new(),
            reloads: ReloadSequence::new(),
            system_hosts_path: RwLock::new(None),
        }
    }

    // ── Reload ───────────────────────────────────────────────────────────────

    /// Replaces the cache with a freshly fetched, normalized configuration
    /// list.
    ///
    /// On failure the cache is cleared ("fail safe to empty") and the error
    /// propagates.  A reload that resolves after a newer reload was issued
    /// discards its result either way.
    pub async fn load_all(&self) -> Result<(), StoreError> {
        let ticket = self.reloads.begin();
        let _busy = self.loading.enter();

        match self.bridge.get_all_configs().await {
            Ok(raw) => {
                let configs = normalize_configurations(&raw);
                if self.reloads.is_current(ticket) {
                    *self.cache.write().await = configs;
                } else {
                    debug!("discarding stale configuration reload");
                }
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to load configurations");
                if self.reloads.is_current(ticket) {
                    self.cache.write().await.clear();
                }
                Err(e.into())
            }
        }
    }

    // ── Mutations (reload-after-write) ───────────────────────────────────────

    /// Creates a configuration and returns the backend's record for it.
    pub async fn create(
        &self,
        name: &str,
        description: &str,
        content: &str,
    ) -> Result<Configuration, StoreError> {
        with_loading_and_reload(
            &self.loading,
            "create configuration",
            async {
                let raw = self.bridge.create_config(name, description, content).await?;
                normalize_configuration(&raw)
                    .ok_or(StoreError::MalformedRecord { kind: "configuration" })
            },
            || self.load_all(),
        )
        .await
    }

    /// Rewrites a configuration's fields and returns the backend's record.
    pub async fn update(
        &self,
        id: &str,
        name: &str,
        description: &str,
        content: &str,
    ) -> Result<Configuration, StoreError> {
        with_loading_and_reload(
            &self.loading,
            "update configuration",
            async {
                let raw = self
                    .bridge
                    .update_config(id, name, description, content)
                    .await?;
                normalize_configuration(&raw)
                    .ok_or(StoreError::MalformedRecord { kind: "configuration" })
            },
            || self.load_all(),
        )
        .await
    }

    /// Deletes a configuration.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        with_loading_and_reload(
            &self.loading,
            "delete configuration",
            async { Ok(self.bridge.delete_config(id).await?) },
            || self.load_all(),
        )
        .await
    }

    /// Applies a configuration to the system hosts file, making it the single
    /// active one.
    pub async fn apply(&self, id: &str) -> Result<(), StoreError> {
        with_loading_and_reload(
            &self.loading,
            "apply configuration",
            async { Ok(self.bridge.apply_config(id).await?) },
            || self.load_all(),
        )
        .await
    }

    /// Restores the platform default hosts content.  The backend deactivates
    /// every configuration as part of this, so the list is reloaded.
    pub async fn restore_default_hosts(&self) -> Result<(), StoreError> {
        with_loading_and_reload(
            &self.loading,
            "restore default hosts",
            async { Ok(self.bridge.restore_default_hosts().await?) },
            || self.load_all(),
        )
        .await
    }

    // ── System hosts pass-throughs ───────────────────────────────────────────

    /// Reads the live system hosts file.
    pub async fn read_system_hosts(&self) -> Result<String, StoreError> {
        safe_async("read system hosts", async {
            Ok(self.bridge.read_system_hosts().await?)
        })
        .await
    }

    /// Writes raw text to the system hosts file.  Does not touch the
    /// configuration list; the backend reports the file change via push
    /// notification.
    pub async fn write_system_hosts(&self, content: &str) -> Result<(), StoreError> {
        with_loading(&self.loading, "write system hosts", async {
            Ok(self.bridge.write_system_hosts(content).await?)
        })
        .await
    }

    /// Validates hosts syntax without writing.
    pub async fn validate_hosts_content(&self, content: &str) -> Result<(), StoreError> {
        safe_async("validate hosts content", async {
            Ok(self.bridge.validate_hosts_content(content).await?)
        })
        .await
    }

    /// Flushes the OS DNS cache.
    pub async fn flush_dns_cache(&self) -> Result<(), StoreError> {
        safe_async("flush DNS cache", async {
            Ok(self.bridge.flush_dns_cache().await?)
        })
        .await
    }

    // ── Read-only views ──────────────────────────────────────────────────────

    /// The cached list, in backend order.
    pub async fn configs(&self) -> Vec<Configuration> {
        self.cache.read().await.clone()
    }

    /// The cached list in display order: active first, then most recently
    /// updated.  Recomputed on every call.
    pub async fn sorted(&self) -> Vec<Configuration> {
        projections::sorted_configurations(&self.cache.read().await)
    }

    /// The currently active configuration, if any.
    pub async fn active(&self) -> Option<Configuration> {
        projections::active_configuration(&self.cache.read().await).cloned()
    }

    /// Whether an operation on this store is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }

    /// The system hosts path resolved at initialization, if known.
    pub async fn system_hosts_path(&self) -> Option<String> {
        self.system_hosts_path.read().await.clone()
    }

    /// Records the resolved system hosts path.  Called by the capability
    /// gate during initialization.
    pub async fn set_system_hosts_path(&self, path: String) {
        *self.system_hosts_path.write().await = Some(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::bridge::{BackendError, MockBackendBridge};
    use serde_json::json;

    fn store_with(mock: MockBackendBridge) -> ConfigStore {
        ConfigStore::new(Arc::new(mock))
    }

    fn two_config_payload() -> serde_json::Value {
        json!([
            {"id": "c1", "name": "dev", "is_active": false, "updated_at": "2024-05-01T00:00:00Z"},
            {"id": "c2", "name": "prod", "is_active": true, "updated_at": "2024-04-01T00:00:00Z"}
        ])
    }

    #[tokio::test]
    async fn test_load_all_replaces_cache_with_normalized_records() {
        let mut mock = MockBackendBridge::new();
        mock.expect_get_all_configs()
            .returning(|| Ok(two_config_payload()));
        let store = store_with(mock);

        store.load_all().await.unwrap();

        let configs = store.configs().await;
        assert_eq!(configs.len(), 2);
        assert_eq!(store.active().await.unwrap().id, "c2");
    }

    #[tokio::test]
    async fn test_failed_load_all_resets_cache_to_empty_and_rethrows() {
        let mut mock = MockBackendBridge::new();
        let mut first = true;
        mock.expect_get_all_configs().returning(move || {
            if first {
                first = false;
                Ok(two_config_payload())
            } else {
                Err(BackendError::new("bridge down"))
            }
        });
        let store = store_with(mock);

        store.load_all().await.unwrap();
        assert_eq!(store.configs().await.len(), 2);

        let result = store.load_all().await;

        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert!(store.configs().await.is_empty(), "fail safe to empty");
    }

    #[tokio::test]
    async fn test_successful_create_reloads_and_returns_the_new_record() {
        let mut mock = MockBackendBridge::new();
        mock.expect_create_config().returning(|name, _, _| {
            Ok(json!({"id": "c9", "name": name, "is_active": false}))
        });
        mock.expect_get_all_configs().times(1).returning(|| {
            Ok(json!([{"id": "c9", "name": "fresh", "is_active": false}]))
        });
        let store = store_with(mock);

        let created = store.create("fresh", "", "").await.unwrap();

        assert_eq!(created.id, "c9");
        let names: Vec<String> = store.configs().await.into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["fresh".to_string()]);
    }

    #[tokio::test]
    async fn test_rejected_create_leaves_cache_untouched_and_skips_reload() {
        let mut mock = MockBackendBridge::new();
        mock.expect_get_all_configs()
            .times(1) // only the seeding load; the failed create must not reload
            .returning(|| Ok(two_config_payload()));
        mock.expect_create_config()
            .returning(|_, _, _| Err(BackendError::new("name already exists")));
        let store = store_with(mock);

        store.load_all().await.unwrap();
        let before = store.configs().await;

        let result = store.create("dup", "", "").await;

        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert_eq!(store.configs().await, before, "no optimistic residue");
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_apply_results_in_exactly_one_active_configuration() {
        // The backend flips the flags; the store only observes the reload.
        let mut mock = MockBackendBridge::new();
        mock.expect_apply_config().returning(|_| Ok(()));
        mock.expect_get_all_configs().returning(|| {
            Ok(json!([
                {"id": "c1", "name": "dev", "is_active": true},
                {"id": "c2", "name": "prod", "is_active": false}
            ]))
        });
        let store = store_with(mock);

        store.apply("c1").await.unwrap();

        let active: Vec<Configuration> = store
            .configs()
            .await
            .into_iter()
            .filter(|c| c.is_active)
            .collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "c1");
    }

    #[tokio::test]
    async fn test_malformed_create_reply_is_a_contract_violation() {
        let mut mock = MockBackendBridge::new();
        mock.expect_create_config()
            .returning(|_, _, _| Ok(json!({"name": "no id though"})));
        let store = store_with(mock);

        let result = store.create("x", "", "").await;

        assert!(matches!(
            result,
            Err(StoreError::MalformedRecord { kind: "configuration" })
        ));
    }

    #[tokio::test]
    async fn test_failed_write_system_hosts_lowers_the_loading_flag() {
        let mut mock = MockBackendBridge::new();
        mock.expect_write_system_hosts()
            .returning(|_| Err(BackendError::new("permission denied")));
        let store = store_with(mock);

        let result = store.write_system_hosts("127.0.0.1 x\n").await;

        assert!(result.is_err());
        assert!(!store.is_loading());
    }
}
