//! Admin capability gate.
//!
//! One question, asked once: does this process already hold the privilege
//! required to write the system hosts file?  The answer is captured at
//! initialization and then served from memory — it is *not* refreshed
//! automatically, so it can go stale if the user elevates mid-session.
//! Callers that need a live answer use [`AdminGate::is_admin_required`],
//! which asks the backend directly and fails safe: if the query itself
//! fails, privilege is assumed to be required.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, warn};

use crate::application::bridge::BackendBridge;
use crate::application::stores::ConfigStore;

/// Tracks whether admin-gated mutations may be attempted.
pub struct AdminGate {
    bridge: Arc<dyn BackendBridge>,
    admin_mode: AtomicBool,
}

impl AdminGate {
    pub fn new(bridge: Arc<dyn BackendBridge>) -> Self {
        Self {
            bridge,
            admin_mode: AtomicBool::new(false),
        }
    }

    /// One-time startup sequence: resolve the system hosts path, capture the
    /// capability flag, then trigger the initial configuration load.
    ///
    /// Failures here are logged and swallowed — a UI that starts with an
    /// empty list and no admin badge is preferable to one that never starts.
    pub async fn initialize(&self, configs: &ConfigStore) {
        match self.bridge.get_system_hosts_path().await {
            Ok(path) => configs.set_system_hosts_path(path).await,
            Err(e) => warn!(error = %e, "could not resolve system hosts path"),
        }

        match self.bridge.is_admin_required().await {
            // "Admin mode active" means the privilege requirement is already
            // satisfied.
            Ok(required) => self.admin_mode.store(!required, Ordering::Relaxed),
            Err(e) => {
                warn!(error = %e, "capability query failed; assuming no admin privileges");
                self.admin_mode.store(false, Ordering::Relaxed);
            }
        }

        if let Err(e) = configs.load_all().await {
            error!(error = %e, "initial configuration load failed");
        }
    }

    /// The flag captured at initialization.  Read-only to the rest of the UI.
    pub fn admin_mode(&self) -> bool {
        self.admin_mode.load(Ordering::Relaxed)
    }

    /// Live capability query.  Defaults to "privilege required" when the
    /// query fails, so a broken bridge never unlocks gated actions.
    pub async fn is_admin_required(&self) -> bool {
        match self.bridge.is_admin_required().await {
            Ok(required) => required,
            Err(e) => {
                warn!(error = %e, "capability query failed; assuming admin is required");
                true
            }
        }
    }
}
