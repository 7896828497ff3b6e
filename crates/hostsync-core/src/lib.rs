//! # hostsync-core
//!
//! Shared library for HostSync containing the canonical domain records, the
//! raw-record normalizer, and the pure projection functions used by the
//! client-side state layer.
//!
//! This crate has zero dependencies on OS APIs, UI frameworks, or network
//! sockets.  It can be compiled and tested anywhere.
//!
//! # Architecture overview
//!
//! HostSync is a desktop manager for the operating system's hosts file: the
//! user maintains several named hosts configurations, applies one of them to
//! the system, keeps automatic/manual backups of the file, and subscribes to
//! remote hosts lists.  A privileged native backend owns every side effect
//! (filesystem, elevation, DNS cache, HTTP); the UI-side state layer only
//! mirrors the backend's authoritative state.
//!
//! This crate is the foundation of that mirror.  It defines:
//!
//! - **`domain`** – The canonical record types (`Configuration`, `Backup`,
//!   `RemoteSource`, …) and the pure projections computed from them (sorted
//!   views, backup statistics).
//!
//! - **`normalize`** – Translation from the backend's loosely-shaped raw JSON
//!   records (case variants, legacy aliases, missing fields) into exactly one
//!   canonical representation, dropping records that are unusable.
//!
//! - **`sequence`** – A thread-safe ticket counter that lets a store ignore
//!   reload results that complete out of issue order.

pub mod domain;
pub mod normalize;
pub mod sequence;

// Re-export the most-used types at the crate root so callers can write
// `hostsync_core::Configuration` instead of the full path.
pub use domain::records::{
    Backup, BackupStats, ConfigSource, Configuration, FetchStatus, RemoteSource, UpdateFrequency,
};
pub use normalize::{
    normalize_backup, normalize_backups, normalize_configuration, normalize_configurations,
    normalize_remote_source, normalize_remote_sources,
};
pub use sequence::ReloadSequence;
