//! Pure derived views over store caches.
//!
//! Every function here is recomputed on demand from the authoritative cache —
//! nothing is memoized, so a projection can never disagree with the cache it
//! was computed from.  Stores call these after each reload; tests call them
//! directly.

use crate::domain::records::{Backup, BackupStats, Configuration, RemoteSource};

/// Configurations ordered for display: active entries first, then by most
/// recent `updated_at`.  Records without a timestamp sort as oldest.
///
/// The sort is stable, so records the ordering cannot distinguish keep their
/// cache order.
pub fn sorted_configurations(configs: &[Configuration]) -> Vec<Configuration> {
    let mut sorted = configs.to_vec();
    sorted.sort_by(|a, b| {
        b.is_active
            .cmp(&a.is_active)
            .then_with(|| b.updated_at.cmp(&a.updated_at))
    });
    sorted
}

/// The currently active configuration, if any.
pub fn active_configuration(configs: &[Configuration]) -> Option<&Configuration> {
    configs.iter().find(|c| c.is_active)
}

/// Backups in the canonical listing order: timestamp descending.
pub fn sorted_backups(backups: &[Backup]) -> Vec<Backup> {
    let mut sorted = backups.to_vec();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sorted
}

/// Only the backups the backend created on its own.
pub fn automatic_backups(backups: &[Backup]) -> Vec<Backup> {
    backups.iter().filter(|b| b.is_automatic).cloned().collect()
}

/// Only the backups the user requested explicitly.
pub fn manual_backups(backups: &[Backup]) -> Vec<Backup> {
    backups.iter().filter(|b| !b.is_automatic).cloned().collect()
}

/// Aggregate counts recomputed from the cached backup list.
pub fn backup_stats(backups: &[Backup]) -> BackupStats {
    let automatic = backups.iter().filter(|b| b.is_automatic).count() as u64;
    BackupStats {
        total: backups.len() as u64,
        automatic,
        manual: backups.len() as u64 - automatic,
        total_size: backups.iter().map(|b| b.size).sum(),
    }
}

/// Remote sources ordered by display name, case-insensitively.
pub fn sorted_remote_sources(sources: &[RemoteSource]) -> Vec<RemoteSource> {
    let mut sorted = sources.to_vec();
    sorted.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    sorted
}
