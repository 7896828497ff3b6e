//! Entity stores: the UI-side caches of the backend's authoritative state.
//!
//! Three parallel stores, one per entity kind.  Each follows the same
//! discipline:
//!
//! - `load_all()` is the **only** writer of the cache, and it replaces the
//!   cache wholesale — no incremental merging, so state changed behind the
//!   UI's back (another process editing the hosts file, say) can never leave
//!   a half-merged view.
//! - Every mutating action is backend-call → `load_all()` → done.  A failed
//!   backend call leaves the cache exactly as it was; there is no optimistic
//!   update to roll back.
//! - A failed `load_all()` clears the cache and propagates the error:
//!   showing an empty list plus an error beats showing stale-but-plausible
//!   data.
//! - Derived views (sorted listings, filters, statistics) are recomputed
//!   from the cache on every call, never stored.
//! - Overlapping reloads are ordered by ticket; a reload that completes
//!   after a newer one was issued discards its result.

pub mod backups;
pub mod configs;
pub mod remotes;

pub use backups::BackupStore;
pub use configs::ConfigStore;
pub use remotes::RemoteStore;
