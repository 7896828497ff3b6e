//! The backend bridge port.
//!
//! The privileged native backend owns every side effect: filesystem access,
//! privilege elevation, DNS cache flushing, and remote HTTP fetching.  The
//! state layer sees it only through this trait, one method per bridge call.
//! Infrastructure supplies the implementation; tests substitute a mock.
//!
//! # Raw payloads
//!
//! Entity-returning calls deliberately return `serde_json::Value`, not typed
//! records: backends of different vintages spell record keys differently
//! (`id`/`ID`, `updateFreq`/`update_freq`, …) and omit fields freely.  All
//! typing happens in `hostsync_core::normalize`, on this side of the
//! boundary, so the trait never has to chase the backend's schema drift.
//!
//! # Errors
//!
//! Every call can fail with a [`BackendError`] — an opaque, human-readable
//! message from the other side of the bridge.  The state layer logs it,
//! leaves its cache untouched (except full reloads, which fail safe to
//! empty), and propagates it to the UI for a notification banner.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use hostsync_core::UpdateFrequency;

/// An error reported by the backend across the bridge.
///
/// The backend's error taxonomy is its own business; all that crosses the
/// bridge is a message fit for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    /// Human-readable failure description.
    pub message: String,
}

impl BackendError {
    /// Creates an error carrying the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Callback invoked for each delivery of a backend push notification.
///
/// Push handlers run on whatever task delivers the notification, so they
/// must be cheap; anything slow (a store reload, for instance) should be
/// spawned.
pub type PushCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Asynchronous call interface to the privileged native backend.
///
/// Grouped by capability area.  Calls are independent; the backend may be
/// mutated by other processes between any two of them, which is why the
/// state layer re-reads instead of trusting call results.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BackendBridge: Send + Sync {
    // ── Configurations ───────────────────────────────────────────────────────

    /// Returns every saved configuration as a raw record list.
    async fn get_all_configs(&self) -> Result<Value, BackendError>;

    /// Creates a configuration; returns the created raw record.
    async fn create_config(
        &self,
        name: &str,
        description: &str,
        content: &str,
    ) -> Result<Value, BackendError>;

    /// Rewrites a configuration's fields; returns the updated raw record.
    async fn update_config(
        &self,
        id: &str,
        name: &str,
        description: &str,
        content: &str,
    ) -> Result<Value, BackendError>;

    /// Deletes a configuration.
    async fn delete_config(&self, id: &str) -> Result<(), BackendError>;

    /// Writes the configuration's content to the system hosts file and makes
    /// it the single active configuration.
    async fn apply_config(&self, id: &str) -> Result<(), BackendError>;

    /// Returns the platform path of the system hosts file.
    async fn get_system_hosts_path(&self) -> Result<String, BackendError>;

    /// Reads the current system hosts file.
    async fn read_system_hosts(&self) -> Result<String, BackendError>;

    /// Writes raw text to the system hosts file.
    async fn write_system_hosts(&self, content: &str) -> Result<(), BackendError>;

    /// Checks hosts syntax without writing anything.
    async fn validate_hosts_content(&self, content: &str) -> Result<(), BackendError>;

    /// Whether writing the system hosts file requires elevation this process
    /// does not have.
    async fn is_admin_required(&self) -> Result<bool, BackendError>;

    /// Restores the platform default hosts content.
    async fn restore_default_hosts(&self) -> Result<(), BackendError>;

    /// Flushes the OS DNS cache.
    async fn flush_dns_cache(&self) -> Result<(), BackendError>;

    // ── Backups ──────────────────────────────────────────────────────────────

    /// Returns every backup as a raw record list.
    async fn get_all_backups(&self) -> Result<Value, BackendError>;

    /// Returns aggregate backup statistics as a raw record.
    async fn get_backup_stats(&self) -> Result<Value, BackendError>;

    /// Snapshots the current system hosts file; returns the raw backup record.
    async fn create_manual_backup(
        &self,
        description: &str,
        tags: &[String],
    ) -> Result<Value, BackendError>;

    /// Creates a backup from caller-supplied content instead of the live file.
    async fn create_manual_backup_with_content(
        &self,
        description: &str,
        content: &str,
        tags: &[String],
    ) -> Result<Value, BackendError>;

    /// Writes a backup's snapshot back to the system hosts file.
    async fn restore_from_backup(&self, id: &str) -> Result<(), BackendError>;

    /// Deletes a backup.
    async fn delete_backup(&self, id: &str) -> Result<(), BackendError>;

    /// Replaces a backup's tag set.
    async fn update_backup_tags(&self, id: &str, tags: &[String]) -> Result<(), BackendError>;

    /// Replaces a backup's description.
    async fn update_backup_description(
        &self,
        id: &str,
        description: &str,
    ) -> Result<(), BackendError>;

    // ── Remote sources ───────────────────────────────────────────────────────

    /// Returns every remote source as a raw record list.
    async fn get_all_remote_sources(&self) -> Result<Value, BackendError>;

    /// Registers a remote source; returns the created raw record.
    async fn add_remote_source(
        &self,
        name: &str,
        url: &str,
        update_freq: UpdateFrequency,
    ) -> Result<Value, BackendError>;

    /// Rewrites a remote source's fields; returns the updated raw record.
    async fn update_remote_source(
        &self,
        id: &str,
        name: &str,
        url: &str,
        update_freq: UpdateFrequency,
    ) -> Result<Value, BackendError>;

    /// Deletes a remote source.
    async fn delete_remote_source(&self, id: &str) -> Result<(), BackendError>;

    /// Fetches the source's URL and returns the body; the backend updates the
    /// source's status/content as a side effect and reports transitions via
    /// the `remote-source-status-changed` push event.
    async fn fetch_remote_hosts(&self, id: &str) -> Result<String, BackendError>;

    /// Creates a configuration from the source's cached (or freshly fetched)
    /// content; returns the raw configuration record.
    async fn create_config_from_remote(&self, id: &str) -> Result<Value, BackendError>;

    /// Refreshes every registered remote source.
    async fn update_all_remote_sources(&self) -> Result<(), BackendError>;

    /// Writes the source's content directly to the system hosts file.
    async fn apply_remote_to_system(&self, id: &str) -> Result<(), BackendError>;

    // ── Push notifications ───────────────────────────────────────────────────

    /// Registers `callback` for deliveries of the named push event.
    /// Registration is keyed by event name; a later registration for the same
    /// name replaces the earlier callback.  Callers wanting fan-out go
    /// through the listener registry, which multiplexes on top of this.
    fn subscribe_push(&self, event: &str, callback: PushCallback);

    /// Removes the subscription for the named push event, if any.
    fn unsubscribe_push(&self, event: &str);
}
