//! Integration tests for the store set over the in-memory backend.
//!
//! # Purpose
//!
//! These tests exercise the stores through their *public* API in the same
//! way the visual layer uses them, with the real infrastructure adapter
//! ([`InMemoryBackend`]) on the other side of the bridge.  They verify:
//!
//! - The reload-after-write loop: after any successful mutation the cache
//!   equals what an independent full load produces.
//! - Failure isolation: a rejected mutation leaves the cache byte-for-byte
//!   as it was, with no optimistic residue.
//! - The apply transition: exactly one active configuration afterwards, and
//!   an automatic backup of the previous hosts content appears.
//! - Push-driven reloads: a backend-initiated notification (an "external"
//!   hosts edit) flows through the listener registry into a store reload.
//! - The remote fetch lifecycle: `pending → success|failed` observed via
//!   push, and the startup refresh sweep.
//!
//! # Waiting for push-driven reloads
//!
//! Push handlers spawn their reloads as tasks, so tests that assert on their
//! effect poll the store briefly instead of sleeping a fixed eternity.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use hostsync_client::application::bridge::BackendBridge;
use hostsync_client::infrastructure::memory::InMemoryBackend;
use hostsync_client::infrastructure::ui_bridge::AppStores;
use hostsync_core::{FetchStatus, UpdateFrequency};

fn assembled() -> (Arc<InMemoryBackend>, AppStores) {
    let backend = Arc::new(InMemoryBackend::new());
    let stores = AppStores::new(backend.clone());
    (backend, stores)
}

/// Polling helper for push-driven effects: re-evaluates the probe up to a
/// hundred times with a short pause, then fails the test.  A macro rather
/// than a function so the probe expression can borrow the store set.
macro_rules! wait_until {
    ($what:expr, $probe:expr) => {{
        let mut satisfied = false;
        for _ in 0..100 {
            if $probe {
                satisfied = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(satisfied, "timed out waiting for: {}", $what);
    }};
}

// ── Reload-after-write ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_appears_in_the_cache_only_through_reload() {
    let (_backend, stores) = assembled();
    stores.initialize().await;

    let created = stores
        .configs
        .create("office", "proxy entries", "10.0.0.1 proxy.corp\n")
        .await
        .unwrap();

    // The cache already reflects the write…
    let names: Vec<String> = stores
        .configs
        .configs()
        .await
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["office".to_string()]);
    assert!(!created.is_active, "creation never activates");

    // …and equals exactly what an independent full load produces.
    let cached = stores.configs.configs().await;
    stores.configs.load_all().await.unwrap();
    assert_eq!(stores.configs.configs().await, cached);
}

#[tokio::test]
async fn test_rejected_create_leaves_no_optimistic_residue() {
    let (backend, stores) = assembled();
    stores.initialize().await;
    stores
        .configs
        .create("first", "", "127.0.0.1 a\n")
        .await
        .unwrap();
    let before = stores.configs.configs().await;

    backend.fail_next("CreateConfig");
    let result = stores.configs.create("second", "", "").await;

    assert!(result.is_err());
    assert_eq!(stores.configs.configs().await, before);
    assert!(!stores.configs.is_loading());
}

// ── The apply transition ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_apply_moves_the_active_flag_atomically_and_snapshots_hosts() {
    let (backend, stores) = assembled();
    stores.initialize().await;
    let a = stores.configs.create("a", "", "127.0.0.1 a\n").await.unwrap();
    let b = stores.configs.create("b", "", "127.0.0.1 b\n").await.unwrap();

    stores.configs.apply(&a.id).await.unwrap();
    stores.configs.apply(&b.id).await.unwrap();

    // Exactly one active configuration, namely the last applied.
    let active: Vec<_> = stores
        .configs
        .configs()
        .await
        .into_iter()
        .filter(|c| c.is_active)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, b.id);
    assert_eq!(backend.system_hosts().await, "127.0.0.1 b\n");

    // The active configuration leads the sorted projection.
    assert_eq!(stores.configs.sorted().await[0].id, b.id);

    // Each apply took an automatic backup of the pre-write hosts content.
    stores.backups.load_all().await.unwrap();
    let backups = stores.backups.automatic().await;
    assert_eq!(backups.len(), 2);
    assert!(backups.iter().any(|bk| bk.content == "127.0.0.1 a\n"));
    assert_eq!(stores.backups.stats_projection().await.automatic, 2);
}

// ── Push-driven reloads ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_backend_initiated_change_reaches_the_cache_via_push() {
    let (backend, stores) = assembled();
    stores.initialize().await;
    let _wiring = stores.wire_push_reloads();

    // Another client of the backend creates a configuration; this store set
    // only hears about it through the push notification.
    backend
        .create_config("external", "made elsewhere", "127.0.0.1 x\n")
        .await
        .unwrap();

    wait_until!(
        "push-triggered configuration reload",
        stores
            .configs
            .configs()
            .await
            .iter()
            .any(|c| c.name == "external")
    );
}

#[tokio::test]
async fn test_dropping_the_wiring_scope_stops_push_reloads() {
    let (backend, stores) = assembled();
    stores.initialize().await;
    {
        let _wiring = stores.wire_push_reloads();
    } // scope dropped: subscriptions torn down

    backend
        .create_config("orphan", "", "127.0.0.1 x\n")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(
        stores.configs.configs().await.is_empty(),
        "no listener should remain after the scope dropped"
    );
    assert_eq!(stores.registry.listener_counts(), (0, 0));
}

#[tokio::test]
async fn test_shutdown_cleans_up_every_subscription_idempotently() {
    let (_backend, stores) = assembled();
    let mut scope = stores.wire_push_reloads();
    // Keep the scope alive; shutdown must still clear the registry.
    scope.register_push("custom-event", "probe", Arc::new(|_: &Value| {}));

    stores.shutdown();
    assert_eq!(stores.registry.listener_counts(), (0, 0));
    stores.shutdown();
    assert_eq!(stores.registry.listener_counts(), (0, 0));
}

// ── Remote sources ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_lifecycle_reaches_success_through_push_reload() {
    let (backend, stores) = assembled();
    stores.initialize().await;
    let _wiring = stores.wire_push_reloads();

    backend
        .seed_remote_body("http://l.example/hosts", "0.0.0.0 ads.example\n")
        .await;
    let source = stores
        .remotes
        .add("blocklist", "http://l.example/hosts", UpdateFrequency::Manual)
        .await
        .unwrap();

    let body = stores.remotes.fetch(&source.id).await.unwrap();
    assert_eq!(body, "0.0.0.0 ads.example\n");

    // fetch() itself does not touch the cache; the status update arrives via
    // the remote-source-status-changed push event.
    wait_until!(
        "fetch status to reach the cache",
        stores
            .remotes
            .sources()
            .await
            .iter()
            .any(|s| s.status == FetchStatus::Success && !s.last_content.is_empty())
    );
}

#[tokio::test]
async fn test_fetch_with_unknown_id_never_reaches_the_backend() {
    let (backend, stores) = assembled();
    stores.initialize().await;

    // Script the backend to fail if the call gets through; it must not.
    backend.fail_next("FetchRemoteHosts");

    let result = stores.remotes.fetch("no-such-id").await;

    assert!(matches!(
        result,
        Err(hostsync_client::application::ops::StoreError::NotFoundLocally { .. })
    ));
    // The injected failure is still armed: the bridge was never called.
    assert!(backend.fetch_remote_hosts("anything").await.is_err());
}

#[tokio::test]
async fn test_startup_refresh_sweeps_only_startup_sources() {
    let (backend, stores) = assembled();
    stores.initialize().await;

    backend.seed_remote_body("http://auto.example/hosts", "0.0.0.0 auto\n").await;
    backend.seed_remote_body("http://manual.example/hosts", "0.0.0.0 manual\n").await;
    stores
        .remotes
        .add("auto", "http://auto.example/hosts", UpdateFrequency::Startup)
        .await
        .unwrap();
    stores
        .remotes
        .add("manual", "http://manual.example/hosts", UpdateFrequency::Manual)
        .await
        .unwrap();

    stores.refresh_startup_sources().await;

    let sources = stores.remotes.sources().await;
    let auto = sources.iter().find(|s| s.name == "auto").unwrap();
    let manual = sources.iter().find(|s| s.name == "manual").unwrap();
    assert_eq!(auto.status, FetchStatus::Success);
    assert_eq!(auto.last_content, "0.0.0.0 auto\n");
    assert_eq!(manual.status, FetchStatus::Pending, "manual sources wait");
}

#[tokio::test]
async fn test_create_config_from_remote_lands_in_the_config_store_via_push() {
    let (backend, stores) = assembled();
    stores.initialize().await;
    let _wiring = stores.wire_push_reloads();

    backend.seed_remote_body("http://l.example/hosts", "0.0.0.0 ads\n").await;
    let source = stores
        .remotes
        .add("list", "http://l.example/hosts", UpdateFrequency::Manual)
        .await
        .unwrap();

    let config = stores
        .remotes
        .create_config_from_remote(&source.id)
        .await
        .unwrap();

    assert_eq!(config.remote_url.as_deref(), Some("http://l.example/hosts"));
    assert_eq!(config.content, "0.0.0.0 ads\n");

    // The configuration store hears about it through config-list-changed.
    wait_until!(
        "imported configuration to reach the config store",
        stores.configs.configs().await.iter().any(|c| c.id == config.id)
    );
}

// ── Backups ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_manual_backup_and_restore_round_trip() {
    let (backend, stores) = assembled();
    stores.initialize().await;

    stores
        .configs
        .write_system_hosts("127.0.0.1 precious\n")
        .await
        .unwrap();
    stores.backups.load_all().await.unwrap();

    let manual = stores
        .backups
        .create_manual("before experiment", &["exp".to_string()])
        .await
        .unwrap();
    assert_eq!(manual.content, "127.0.0.1 precious\n");

    // Wreck the hosts file, then restore.
    stores
        .configs
        .write_system_hosts("127.0.0.1 wrecked\n")
        .await
        .unwrap();
    stores.backups.restore(&manual.id).await.unwrap();

    assert_eq!(backend.system_hosts().await, "127.0.0.1 precious\n");

    // Stats track every write's automatic snapshot plus the manual one.
    let stats = stores.backups.stats_projection().await;
    assert_eq!(stats.manual, 1);
    assert!(stats.automatic >= 2, "each hosts write snapshotted first");
}

#[tokio::test]
async fn test_backup_metadata_edits_survive_the_reload() {
    let (_backend, stores) = assembled();
    stores.initialize().await;
    let backup = stores.backups.create_manual("draft", &[]).await.unwrap();

    stores
        .backups
        .update_description(&backup.id, "final")
        .await
        .unwrap();
    stores
        .backups
        .update_tags(&backup.id, &["keep".to_string(), "prod".to_string()])
        .await
        .unwrap();

    let reloaded = stores
        .backups
        .backups()
        .await
        .into_iter()
        .find(|b| b.id == backup.id)
        .unwrap();
    assert_eq!(reloaded.description, "final");
    assert_eq!(reloaded.tags, vec!["keep".to_string(), "prod".to_string()]);
}

// ── Capability gate ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_admin_mode_reflects_the_backend_capability_at_initialize() {
    let (backend, stores) = assembled();
    backend.set_admin_required(true).await;

    stores.initialize().await;
    assert!(!stores.gate.admin_mode(), "elevation missing: admin mode off");

    // The backend's answer changes later; the captured flag does not.
    backend.set_admin_required(false).await;
    assert!(!stores.gate.admin_mode());
    assert!(!stores.gate.is_admin_required().await, "live query updates");

    let snapshot = stores.snapshot().await;
    assert!(!snapshot.admin_mode);
    assert_eq!(snapshot.system_hosts_path.as_deref(), Some("/etc/hosts"));
}

// ── Fail safe to empty ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_failed_full_reload_empties_the_cache_and_surfaces_the_error() {
    let (backend, stores) = assembled();
    stores.initialize().await;
    stores
        .configs
        .create("doomed", "", "127.0.0.1 a\n")
        .await
        .unwrap();
    assert_eq!(stores.configs.configs().await.len(), 1);

    backend.fail_next("GetAllConfigs");
    let result = stores.configs.load_all().await;

    assert!(result.is_err());
    assert!(
        stores.configs.configs().await.is_empty(),
        "an empty list plus an error, never stale-but-plausible data"
    );
}
