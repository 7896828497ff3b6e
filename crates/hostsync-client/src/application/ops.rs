//! Async-operation policies shared by every store action.
//!
//! All mutating store actions have the same skeleton: raise the store's
//! loading flag, call the backend, reload the authoritative state on
//! success, log and propagate on failure, and *always* lower the flag on
//! the way out.  These helpers hold that skeleton in one place so each
//! store action is a one-liner around its bridge call.
//!
//! # The loading window
//!
//! The flag stays raised for the entire (operation + reload) span, so "not
//! loading" always means "the cache reflects the write you just made", not
//! merely "the write completed".  The reset runs from an RAII guard's `Drop`,
//! which makes it unconditional: success, operation failure, reload failure,
//! even a panic inside the reload all lower the flag.
//!
//! Overlapping operations on the same store both toggle the one flag; the
//! first of them to finish lowers it even if the other is still running.
//! That approximation is accepted — the flag drives a spinner, not
//! correctness.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::error;

use crate::application::bridge::BackendError;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors surfaced by store operations.
///
/// The variants keep the failure classes apart: backend-communication
/// failures are rethrown with their message, local validation failures never
/// reach the backend at all, and a malformed single-entity reply is a
/// backend contract violation (bulk-load rejects, by contrast, drop silently
/// during normalization).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The bridge call itself failed; the backend's message is preserved.
    #[error("backend call failed: {0}")]
    Backend(#[from] BackendError),

    /// A caller-supplied identifier was empty or blank.
    #[error("invalid identifier: {0:?}")]
    InvalidId(String),

    /// The identifier is well-formed but absent from the local cache.
    /// Raised before any backend call is attempted.
    #[error("remote source not found locally: {id}")]
    NotFoundLocally { id: String },

    /// The backend's reply to a create/update failed normalization.
    #[error("backend returned an unusable {kind} record")]
    MalformedRecord { kind: &'static str },
}

// ── Loading flag ──────────────────────────────────────────────────────────────

/// Shared busy indicator for one store.
///
/// An `AtomicBool` rather than a lock: readers poll it from the UI thread
/// and writers only ever set/clear, so there is nothing to guard.
#[derive(Debug, Default)]
pub struct LoadingFlag {
    busy: AtomicBool,
}

impl LoadingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an operation (including its trailing reload) is in flight.
    pub fn is_loading(&self) -> bool {
        self.busy.load(Ordering::Relaxed)
    }

    /// Raises the flag and returns the guard that lowers it on drop.
    pub fn enter(&self) -> LoadingGuard<'_> {
        self.busy.store(true, Ordering::Relaxed);
        LoadingGuard { flag: self }
    }
}

/// Lowers the owning [`LoadingFlag`] when dropped.
pub struct LoadingGuard<'a> {
    flag: &'a LoadingFlag,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.flag.busy.store(false, Ordering::Relaxed);
    }
}

// ── Policies ──────────────────────────────────────────────────────────────────

/// Runs `op` under the loading flag.
///
/// On failure the error is logged (tagged with `action`) and propagated; the
/// flag is lowered on every exit path.
pub async fn with_loading<T, Fut>(
    flag: &LoadingFlag,
    action: &str,
    op: Fut,
) -> Result<T, StoreError>
where
    Fut: Future<Output = Result<T, StoreError>>,
{
    let _busy = flag.enter();
    log_failure(action, op.await)
}

/// Runs `op` under the loading flag and, on success, awaits `reload` before
/// returning — the canonical shape for every mutating store action.
///
/// The store never trusts the mutation's return value as the new truth; the
/// reload re-derives the cache from a full read.  The flag covers both
/// halves, and is lowered even when the reload itself fails.
pub async fn with_loading_and_reload<T, Fut, R, RFut>(
    flag: &LoadingFlag,
    action: &str,
    op: Fut,
    reload: R,
) -> Result<T, StoreError>
where
    Fut: Future<Output = Result<T, StoreError>>,
    R: FnOnce() -> RFut,
    RFut: Future<Output = Result<(), StoreError>>,
{
    let _busy = flag.enter();
    let value = log_failure(action, op.await)?;
    log_failure(action, reload().await)?;
    Ok(value)
}

/// Same error policy as [`with_loading`], without the flag — for read-only
/// calls that do not warrant a busy indicator.
pub async fn safe_async<T, Fut>(action: &str, op: Fut) -> Result<T, StoreError>
where
    Fut: Future<Output = Result<T, StoreError>>,
{
    log_failure(action, op.await)
}

fn log_failure<T>(action: &str, result: Result<T, StoreError>) -> Result<T, StoreError> {
    if let Err(e) = &result {
        error!(action, error = %e, "store operation failed");
    }
    result
}
