//! hostsync-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/` and
//! the binary entry point in `main.rs` share the same module tree.
//!
//! # What does hostsync-client do?
//!
//! The privileged native backend owns the truth: the system hosts file, the
//! saved configurations, the backup archive, and the remote-source registry.
//! The UI never mutates any of that directly — it issues asynchronous bridge
//! calls and then *re-reads* the authoritative state.  This crate is the
//! layer in between:
//!
//! 1. The [`application::bridge::BackendBridge`] port describes every call
//!    the backend answers, plus its push-notification mechanism.
//! 2. The entity stores ([`application::stores`]) hold the UI-side caches.
//!    Every mutation goes backend-call → full reload → cache replacement, so
//!    the cache never contains an optimistic guess.
//! 3. Raw records coming back from the backend are normalized
//!    (`hostsync-core`) before they are cached.
//! 4. The listener registry ([`infrastructure::events`]) wires backend push
//!    notifications (for example "another process edited the hosts file")
//!    into store reloads, with idempotent registration and scoped teardown.

/// Application layer: the backend port, async-operation policies, entity
/// stores, and the admin capability gate.
pub mod application;

/// Infrastructure layer: event wiring, the in-memory backend, settings
/// persistence, and the UI-facing assembly.
pub mod infrastructure;
