//! Remote-source store.
//!
//! Caches the registered remote hosts-list subscriptions.  Actions that
//! target a single source (`fetch`, `create_config_from_remote`,
//! `apply_to_system`) validate the identifier against the local cache
//! *before* any bridge call: a stale UI holding an id the backend no longer
//! knows should fail fast with "not found locally", which is a different
//! situation — and a different error — than the bridge being down.
//!
//! `fetch` does not reload this store; the backend walks the source through
//! its `pending → success|failed` status lifecycle and announces each step
//! with a `remote-source-status-changed` push event, which the composition
//! root wires to a reload.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error};

use hostsync_core::domain::projections;
use hostsync_core::{
    normalize_configuration, normalize_remote_source, normalize_remote_sources, Configuration,
    ReloadSequence, RemoteSource, UpdateFrequency,
};

use crate::application::bridge::BackendBridge;
use crate::application::ops::{with_loading, with_loading_and_reload, LoadingFlag, StoreError};

/// UI-side cache of the backend's remote-source registry.
pub struct RemoteStore {
    bridge: Arc<dyn BackendBridge>,
    cache: RwLock<Vec<RemoteSource>>,
    loading: LoadingFlag,
    reloads: ReloadSequence,
}

impl RemoteStore {
    pub fn new(bridge: Arc<dyn BackendBridge>) -> Self {
        Self {
            bridge,
            cache: RwLock::new(Vec::new()),
            loading: LoadingFlag::new(),
            reloads: ReloadSequence::new(),
        }
    }

    // ── Reload ───────────────────────────────────────────────────────────────

    /// Replaces the cache with a freshly fetched, normalized source list.
    ///
    /// Fail safe to empty on error; stale completions are discarded.
    pub async fn load_all(&self) -> Result<(), StoreError> {
        let ticket = self.reloads.begin();
        let _busy = self.loading.enter();

        match self.bridge.get_all_remote_sources().await {
            Ok(raw) => {
                let sources = normalize_remote_sources(&raw);
                if self.reloads.is_current(ticket) {
                    *self.cache.write().await = sources;
                } else {
                    debug!("discarding stale remote-source reload");
                }
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "failed to load remote sources");
                if self.reloads.is_current(ticket) {
                    self.cache.write().await.clear();
                }
                Err(e.into())
            }
        }
    }

    // ── Local validation ─────────────────────────────────────────────────────

    /// Looks up an identifier in the local cache, trimming the candidate
    /// first and tolerating padding in the cached id as well.
    ///
    /// Never issues a backend call.  A blank id is [`StoreError::InvalidId`];
    /// an id the cache does not hold is [`StoreError::NotFoundLocally`].
    pub async fn validate_source_id(&self, id: &str) -> Result<RemoteSource, StoreError> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(StoreError::InvalidId(id.to_string()));
        }

        self.cache
            .read()
            .await
            .iter()
            .find(|s| s.id == trimmed || s.id.trim() == trimmed)
            .cloned()
            .ok_or_else(|| StoreError::NotFoundLocally {
                id: trimmed.to_string(),
            })
    }

    // ── Mutations (reload-after-write) ───────────────────────────────────────

    /// Registers a remote source and returns the backend's record for it.
    pub async fn add(
        &self,
        name: &str,
        url: &str,
        update_freq: UpdateFrequency,
    ) -> Result<RemoteSource, StoreError> {
        with_loading_and_reload(
            &self.loading,
            "add remote source",
            async {
                let raw = self.bridge.add_remote_source(name, url, update_freq).await?;
                normalize_remote_source(&raw)
                    .ok_or(StoreError::MalformedRecord { kind: "remote source" })
            },
            || self.load_all(),
        )
        .await
    }

    /// Rewrites a source's fields and returns the backend's record.
    pub async fn update(
        &self,
        id: &str,
        name: &str,
        url: &str,
        update_freq: UpdateFrequency,
    ) -> Result<RemoteSource, StoreError> {
        with_loading_and_reload(
            &self.loading,
            "update remote source",
            async {
                let raw = self
                    .bridge
                    .update_remote_source(id, name, url, update_freq)
                    .await?;
                normalize_remote_source(&raw)
                    .ok_or(StoreError::MalformedRecord { kind: "remote source" })
            },
            || self.load_all(),
        )
        .await
    }

    /// Deletes a remote source.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        with_loading_and_reload(
            &self.loading,
            "delete remote source",
            async { Ok(self.bridge.delete_remote_source(id).await?) },
            || self.load_all(),
        )
        .await
    }

    /// Refreshes every registered source on the backend, then reloads.
    pub async fn update_all(&self) -> Result<(), StoreError> {
        with_loading_and_reload(
            &self.loading,
            "update all remote sources",
            async { Ok(self.bridge.update_all_remote_sources().await?) },
            || self.load_all(),
        )
        .await
    }

    // ── Single-source actions (validated locally first) ──────────────────────

    /// Fetches the source's URL and returns the body.  Status transitions
    /// arrive separately via push notification.
    pub async fn fetch(&self, id: &str) -> Result<String, StoreError> {
        let source = self.validate_source_id(id).await?;
        debug!(source = %source.name, url = %source.url, "fetching remote hosts");

        with_loading(&self.loading, "fetch remote hosts", async {
            Ok(self.bridge.fetch_remote_hosts(id).await?)
        })
        .await
    }

    /// Creates a configuration from the source's content and returns it.
    /// The configuration store learns about it through the backend's
    /// `config-list-changed` push event, not from this store.
    pub async fn create_config_from_remote(&self, id: &str) -> Result<Configuration, StoreError> {
        let source = self.validate_source_id(id).await?;
        debug!(source = %source.name, "creating configuration from remote source");

        with_loading(&self.loading, "create config from remote", async {
            let raw = self.bridge.create_config_from_remote(id).await?;
            normalize_configuration(&raw)
                .ok_or(StoreError::MalformedRecord { kind: "configuration" })
        })
        .await
    }

    /// Writes the source's content straight to the system hosts file.
    pub async fn apply_to_system(&self, id: &str) -> Result<(), StoreError> {
        let source = self.validate_source_id(id).await?;
        debug!(source = %source.name, "applying remote source to system hosts");

        with_loading(&self.loading, "apply remote source to system", async {
            Ok(self.bridge.apply_remote_to_system(id).await?)
        })
        .await
    }

    // ── Read-only views ──────────────────────────────────────────────────────

    /// The cached list, in backend order.
    pub async fn sources(&self) -> Vec<RemoteSource> {
        self.cache.read().await.clone()
    }

    /// The cached list in display order (name, case-insensitive).
    /// Recomputed on every call.
    pub async fn sorted(&self) -> Vec<RemoteSource> {
        projections::sorted_remote_sources(&self.cache.read().await)
    }

    /// Whether an operation on this store is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.is_loading()
    }
}
