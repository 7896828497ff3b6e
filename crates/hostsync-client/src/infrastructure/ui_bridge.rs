//! Assembly and snapshot surface for the visual layer.
//!
//! [`AppStores`] is the application's composition root: it owns the three
//! entity stores, the capability gate, and the listener registry, and it is
//! the one place where backend push notifications get wired to store
//! reloads.  The visual layer receives it by reference, reads state through
//! [`AppStores::snapshot`], and invokes the store actions directly.
//!
//! # DTOs and the result envelope
//!
//! Store state lives behind async locks and is not directly serializable
//! across a UI boundary.  [`UiSnapshot`] is a plain serializable copy,
//! already projected into display order.  [`UiResult`] is the uniform
//! envelope the UI unwraps with a single error-handling path:
//!
//! ```json
//! { "success": true,  "data": {…}, "error": null }
//! { "success": false, "data": null, "error": "backend call failed: …" }
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use hostsync_core::{Backup, BackupStats, Configuration, RemoteSource, UpdateFrequency};

use crate::application::bridge::BackendBridge;
use crate::application::gate::AdminGate;
use crate::application::ops::StoreError;
use crate::application::stores::{BackupStore, ConfigStore, RemoteStore};
use crate::infrastructure::events::{ListenerRegistry, ListenerScope};

// ── Result envelope ───────────────────────────────────────────────────────────

/// Unified response wrapper handed across the UI boundary.
#[derive(Debug, Serialize)]
pub struct UiResult<T: Serialize> {
    /// `true` if the action completed successfully.
    pub success: bool,
    /// The action's return value, present only on success.
    pub data: Option<T>,
    /// A human-readable error message, present only on failure.
    pub error: Option<String>,
}

impl<T: Serialize> UiResult<T> {
    /// Constructs a successful result containing `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Constructs an error result containing the given message.
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

impl<T: Serialize> From<Result<T, StoreError>> for UiResult<T> {
    fn from(result: Result<T, StoreError>) -> Self {
        match result {
            Ok(value) => UiResult::ok(value),
            Err(e) => UiResult::err(e.to_string()),
        }
    }
}

// ── Snapshot DTOs ─────────────────────────────────────────────────────────────

/// Per-store busy indicators.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LoadingSnapshot {
    pub configs: bool,
    pub backups: bool,
    pub remotes: bool,
}

/// Full read-only state snapshot for the visual layer, with every list
/// already in display order.
#[derive(Debug, Clone, Serialize)]
pub struct UiSnapshot {
    pub configs: Vec<Configuration>,
    pub active_config: Option<Configuration>,
    pub system_hosts_path: Option<String>,
    pub admin_mode: bool,
    pub backups: Vec<Backup>,
    pub backup_stats: BackupStats,
    pub remote_sources: Vec<RemoteSource>,
    pub loading: LoadingSnapshot,
}

// ── Composition root ──────────────────────────────────────────────────────────

/// The assembled state layer: stores, gate, and listener registry.
pub struct AppStores {
    pub configs: Arc<ConfigStore>,
    pub backups: Arc<BackupStore>,
    pub remotes: Arc<RemoteStore>,
    pub gate: Arc<AdminGate>,
    pub registry: ListenerRegistry,
}

impl AppStores {
    /// Builds the store set over one shared bridge.
    pub fn new(bridge: Arc<dyn BackendBridge>) -> Self {
        Self {
            configs: Arc::new(ConfigStore::new(Arc::clone(&bridge))),
            backups: Arc::new(BackupStore::new(Arc::clone(&bridge))),
            remotes: Arc::new(RemoteStore::new(Arc::clone(&bridge))),
            gate: Arc::new(AdminGate::new(Arc::clone(&bridge))),
            registry: ListenerRegistry::new(bridge),
        }
    }

    /// One-time startup sequence: capability gate (which performs the first
    /// configuration load), then the other two stores.  Individual failures
    /// are logged — the UI starts with whatever loaded.
    pub async fn initialize(&self) {
        self.gate.initialize(&self.configs).await;
        if let Err(e) = self.backups.load_all().await {
            warn!(error = %e, "initial backup load failed");
        }
        if let Err(e) = self.remotes.load_all().await {
            warn!(error = %e, "initial remote-source load failed");
        }
    }

    /// Wires every backend push notification to the reload of the store it
    /// invalidates.  The returned scope owns the wiring: drop it (or call
    /// [`ListenerRegistry::cleanup_all`]) to tear everything down.
    pub fn wire_push_reloads(&self) -> ListenerScope {
        let mut scope = self.registry.scope();

        for event in ["config-list-changed", "config-applied"] {
            let store = Arc::clone(&self.configs);
            scope.register_push(
                event,
                "reload-configs",
                Arc::new(move |_payload| {
                    let store = Arc::clone(&store);
                    tokio::spawn(async move {
                        if let Err(e) = store.load_all().await {
                            warn!(error = %e, "push-triggered configuration reload failed");
                        }
                    });
                }),
            );
        }

        for event in [
            "backup-created",
            "backup-deleted",
            "backup-updated",
            "backup-restored",
        ] {
            let store = Arc::clone(&self.backups);
            scope.register_push(
                event,
                "reload-backups",
                Arc::new(move |_payload| {
                    let store = Arc::clone(&store);
                    tokio::spawn(async move {
                        if let Err(e) = store.load_all().await {
                            warn!(error = %e, "push-triggered backup reload failed");
                        }
                    });
                }),
            );
        }

        for event in ["remote-source-list-changed", "remote-source-status-changed"] {
            let store = Arc::clone(&self.remotes);
            scope.register_push(
                event,
                "reload-remotes",
                Arc::new(move |_payload| {
                    let store = Arc::clone(&store);
                    tokio::spawn(async move {
                        if let Err(e) = store.load_all().await {
                            warn!(error = %e, "push-triggered remote-source reload failed");
                        }
                    });
                }),
            );
        }

        scope
    }

    /// Fetches every remote source configured for startup refresh, then
    /// reloads the store once.  Individual fetch failures only mark the
    /// affected source failed.
    pub async fn refresh_startup_sources(&self) {
        let startup_ids: Vec<String> = self
            .remotes
            .sources()
            .await
            .into_iter()
            .filter(|s| s.update_freq == UpdateFrequency::Startup)
            .map(|s| s.id)
            .collect();

        for id in &startup_ids {
            if let Err(e) = self.remotes.fetch(id).await {
                warn!(source_id = %id, error = %e, "startup refresh failed for source");
            }
        }

        if !startup_ids.is_empty() {
            if let Err(e) = self.remotes.load_all().await {
                warn!(error = %e, "reload after startup refresh failed");
            }
        }
    }

    /// A serializable snapshot of everything the visual layer renders.
    pub async fn snapshot(&self) -> UiSnapshot {
        UiSnapshot {
            configs: self.configs.sorted().await,
            active_config: self.configs.active().await,
            system_hosts_path: self.configs.system_hosts_path().await,
            admin_mode: self.gate.admin_mode(),
            backups: self.backups.sorted().await,
            backup_stats: self.backups.stats().await,
            remote_sources: self.remotes.sorted().await,
            loading: LoadingSnapshot {
                configs: self.configs.is_loading(),
                backups: self.backups.is_loading(),
                remotes: self.remotes.is_loading(),
            },
        }
    }

    /// Tears down every subscription the registry tracks.  Called exactly
    /// once at application shutdown (idempotent if called again).
    pub fn shutdown(&self) {
        self.registry.cleanup_all();
    }
}
