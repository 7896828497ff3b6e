//! Canonical record types for configurations, backups, and remote sources.
//!
//! These are the *only* shapes the state layer stores.  Raw records from the
//! backend arrive as loosely-shaped JSON with inconsistent key casing and
//! missing fields; they become one of these types (or are dropped) in
//! [`crate::normalize`] before anything else touches them.
//!
//! # Serde representation
//!
//! All records serialize with camelCase keys; that spelling is also the
//! highest-priority key during normalization, so a record round-trips through
//! its own serialization unchanged:
//!
//! ```json
//! {"id":"…","name":"…","url":"…","updateFreq":"manual","status":"pending"}
//! ```
//!
//! Enumerated fields are closed sets.  Anything outside the set is coerced to
//! the default during normalization rather than rejected — a record with a
//! bogus `status` is still a usable record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Enumerations ──────────────────────────────────────────────────────────────

/// How often a remote source is refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateFrequency {
    /// Refreshed only when the user asks.
    #[default]
    Manual,
    /// Refreshed automatically shortly after application startup.
    Startup,
}

impl UpdateFrequency {
    /// The wire spelling of this variant.
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateFrequency::Manual => "manual",
            UpdateFrequency::Startup => "startup",
        }
    }

    /// Parses a raw wire value, coercing anything outside the closed set
    /// (including casing variants and garbage) to [`UpdateFrequency::Manual`].
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim() {
            "startup" => UpdateFrequency::Startup,
            _ => UpdateFrequency::Manual,
        }
    }
}

impl std::fmt::Display for UpdateFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the most recent fetch of a remote source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    /// Never fetched, or a fetch is currently in flight.
    #[default]
    Pending,
    /// The last fetch completed and its body was cached.
    Success,
    /// The last fetch failed.
    Failed,
}

impl FetchStatus {
    /// The wire spelling of this variant.
    pub fn as_str(self) -> &'static str {
        match self {
            FetchStatus::Pending => "pending",
            FetchStatus::Success => "success",
            FetchStatus::Failed => "failed",
        }
    }

    /// Parses a raw wire value, coercing anything outside the closed set to
    /// [`FetchStatus::Pending`].
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim() {
            "success" => FetchStatus::Success,
            "failed" => FetchStatus::Failed,
            _ => FetchStatus::Pending,
        }
    }
}

impl std::fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Authored by the user in this application.
    #[default]
    Local,
    /// Created from a fetched remote hosts list.
    Remote,
}

impl ConfigSource {
    /// The wire spelling of this variant.
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigSource::Local => "local",
            ConfigSource::Remote => "remote",
        }
    }

    /// Parses a raw wire value, coercing unknowns to [`ConfigSource::Local`].
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim() {
            "remote" => ConfigSource::Remote,
            _ => ConfigSource::Local,
        }
    }
}

// ── Records ───────────────────────────────────────────────────────────────────

/// A named hosts-file configuration.
///
/// At most one configuration is active at any time; "apply" moves the flag
/// from the previously active configuration to the target.  The state layer
/// never toggles `is_active` locally — the transition is observed only
/// through a full reload, which is what makes it look atomic to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Opaque identifier assigned by the backend.
    pub id: String,
    /// Display name (cleaned, at most 100 characters).
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Raw hosts-file text.  Multi-line; stored verbatim.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_active: bool,
    /// Where this configuration came from.
    #[serde(default)]
    pub source: ConfigSource,
    /// Originating URL when `source` is [`ConfigSource::Remote`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A snapshot of the system hosts file taken by the backend.
///
/// Backups are created implicitly on every system-hosts write (apply,
/// restore, apply-remote) and explicitly on user request.  Only the
/// description and tags are ever edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    /// Opaque identifier assigned by the backend.
    pub id: String,
    /// When the snapshot was taken.  Absent timestamps sort as oldest.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// `true` for backups the backend took on its own before a write.
    #[serde(default)]
    pub is_automatic: bool,
    #[serde(default)]
    pub description: String,
    /// User labels.  Deduplicated during normalization, order preserved.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Snapshot size in bytes.
    #[serde(default)]
    pub size: u64,
    /// The snapshotted hosts text.  Multi-line; stored verbatim.
    #[serde(default)]
    pub content: String,
    /// Content hash the backend uses for dedup.  Carried opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// Aggregate backup counts, either loaded from the backend or recomputed
/// from the cached backup list (see [`crate::domain::projections`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStats {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub automatic: u64,
    #[serde(default)]
    pub manual: u64,
    #[serde(default, alias = "total_size")]
    pub total_size: u64,
}

impl BackupStats {
    /// Deserializes a raw stats payload, falling back to all-zero on any
    /// mismatch.  Stats are best-effort; a malformed reply must not fail the
    /// caller.
    pub fn from_raw(raw: &serde_json::Value) -> Self {
        serde_json::from_value(raw.clone()).unwrap_or_default()
    }
}

/// A subscription to a remotely hosted hosts list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSource {
    /// Opaque identifier assigned by the backend.
    pub id: String,
    /// Display name (cleaned, at most 100 characters).
    pub name: String,
    /// Fetch URL.  Scheme validation is the backend's job; the state layer
    /// stores whatever survived normalization.
    pub url: String,
    #[serde(default)]
    pub update_freq: UpdateFrequency,
    /// When the source was last fetched successfully.
    #[serde(default)]
    pub last_updated_at: Option<DateTime<Utc>>,
    /// Cached body of the last successful fetch.  Multi-line; verbatim.
    #[serde(default)]
    pub last_content: String,
    #[serde(default)]
    pub status: FetchStatus,
}
