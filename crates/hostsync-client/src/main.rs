//! HostSync client demo entry point.
//!
//! Wires the state layer against the in-memory backend and runs it as a
//! small daemon: push notifications flow into store reloads until ctrl-c.
//! The shipping desktop application performs exactly this wiring with the
//! real privileged backend adapter in place of [`InMemoryBackend`].
//!
//! ```text
//! main()
//!  └─ load_settings()             -- log level, startup refresh policy
//!  └─ AppStores::new(bridge)      -- stores + gate + listener registry
//!  └─ initialize()                -- capability gate, first loads
//!  └─ wire_push_reloads()         -- push event -> store reload
//!  └─ refresh_startup_sources()   -- delayed, per settings
//!  └─ ctrl-c                      -- cleanup_all + exit
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hostsync_client::infrastructure::memory::InMemoryBackend;
use hostsync_client::infrastructure::settings::load_settings;
use hostsync_client::infrastructure::ui_bridge::AppStores;
use hostsync_core::UpdateFrequency;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = load_settings().unwrap_or_else(|e| {
        eprintln!("settings unreadable ({e}); continuing with defaults");
        Default::default()
    });

    // Initialise structured logging.  RUST_LOG wins over the settings file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.general.log_level.clone())),
        )
        .init();

    info!("HostSync client starting");

    // ── Backend bridge ────────────────────────────────────────────────────────
    // In production: replace InMemoryBackend with the privileged backend
    // adapter.  The demo seeds a little state so there is something to see.
    let backend = Arc::new(InMemoryBackend::new());
    backend
        .seed_remote_body(
            "http://lists.example/blocklist.txt",
            "# demo blocklist\n0.0.0.0 ads.example\n0.0.0.0 tracker.example\n",
        )
        .await;

    let stores = AppStores::new(backend.clone());

    // ── Startup sequence ──────────────────────────────────────────────────────
    stores.initialize().await;

    let _push_wiring = stores.wire_push_reloads();

    // Demo data: one local configuration and one startup-refreshed source.
    if let Err(e) = stores
        .configs
        .create("Workstation", "local dev entries", "127.0.0.1 dev.local\n")
        .await
    {
        warn!(error = %e, "seeding demo configuration failed");
    }
    if let Err(e) = stores
        .remotes
        .add(
            "Demo blocklist",
            "http://lists.example/blocklist.txt",
            UpdateFrequency::Startup,
        )
        .await
    {
        warn!(error = %e, "seeding demo remote source failed");
    }

    if settings.startup.refresh_startup_sources {
        tokio::time::sleep(Duration::from_secs(settings.startup.refresh_delay_secs)).await;
        stores.refresh_startup_sources().await;
    }

    let snapshot = stores.snapshot().await;
    info!(
        configs = snapshot.configs.len(),
        backups = snapshot.backups.len(),
        remote_sources = snapshot.remote_sources.len(),
        admin_mode = snapshot.admin_mode,
        "state layer ready"
    );

    // ── Run until shutdown ────────────────────────────────────────────────────
    info!("HostSync client ready; press ctrl-c to exit");
    tokio::signal::ctrl_c().await?;

    stores.shutdown();
    info!("HostSync client stopped");
    Ok(())
}
