//! Normalization of raw backend records into canonical types.
//!
//! The backend's entity-list calls return loosely-shaped JSON: key casing
//! varies between backend versions, optional fields are simply absent, and
//! enumerated fields sometimes carry values outside their set.  Every record
//! passes through this module exactly once, on its way into a store cache.
//!
//! # Resolution rules
//!
//! - Each field is resolved through a fixed, ordered alias list (canonical
//!   camelCase spelling first, then the known legacy spellings); the first
//!   non-empty match wins.
//! - Scalar text is trimmed and stripped of C0/DEL control characters;
//!   name-like fields are capped at 100 characters.  Multi-line hosts
//!   payloads are carried verbatim.
//! - Enumerated fields are coerced into their closed set
//!   ([`UpdateFrequency`], [`FetchStatus`], [`ConfigSource`]); out-of-set
//!   values become the default rather than failing the record.
//! - A record missing its identity fields after cleaning is unusable and is
//!   rejected: remote sources require id + name + url, configurations
//!   require id + name, backups require id.
//!
//! The `normalize_*s` plural forms accept either a JSON array or a bare
//! object (treated as a one-element sequence) and silently drop rejected
//! records — callers must not assume output length equals input length.
//!
//! These functions are pure and total: malformed input yields `None` or an
//! empty vector, never a panic.

mod fields;

use serde_json::Value;
use tracing::warn;

use crate::domain::records::{
    Backup, ConfigSource, Configuration, FetchStatus, RemoteSource, UpdateFrequency,
};
use fields::{
    as_object, resolve_bool, resolve_name, resolve_payload, resolve_raw_string, resolve_tags,
    resolve_text, resolve_timestamp, resolve_u64,
};

// ── Alias tables ──────────────────────────────────────────────────────────────
// Canonical spelling first; order is the resolution priority.

const ID_KEYS: &[&str] = &["id", "ID", "Id"];
const NAME_KEYS: &[&str] = &["name", "Name"];
const URL_KEYS: &[&str] = &["url", "URL", "Url"];
const UPDATE_FREQ_KEYS: &[&str] = &["updateFreq", "UpdateFreq", "update_freq"];
const LAST_UPDATED_AT_KEYS: &[&str] = &["lastUpdatedAt", "LastUpdatedAt", "last_updated_at"];
const LAST_CONTENT_KEYS: &[&str] = &["lastContent", "LastContent", "last_content"];
const STATUS_KEYS: &[&str] = &["status", "Status"];

const DESCRIPTION_KEYS: &[&str] = &["description", "Description"];
const CONTENT_KEYS: &[&str] = &["content", "Content"];
const IS_ACTIVE_KEYS: &[&str] = &["isActive", "is_active", "IsActive"];
const SOURCE_KEYS: &[&str] = &["source", "Source"];
const REMOTE_URL_KEYS: &[&str] = &["remoteUrl", "remote_url", "RemoteURL"];
const CREATED_AT_KEYS: &[&str] = &["createdAt", "created_at", "CreatedAt"];
const UPDATED_AT_KEYS: &[&str] = &["updatedAt", "updated_at", "UpdatedAt"];

const TIMESTAMP_KEYS: &[&str] = &["timestamp", "Timestamp"];
const IS_AUTOMATIC_KEYS: &[&str] = &["isAutomatic", "is_automatic", "IsAutomatic"];
const TAGS_KEYS: &[&str] = &["tags", "Tags"];
const SIZE_KEYS: &[&str] = &["size", "Size"];
const HASH_KEYS: &[&str] = &["hash", "Hash"];

// ── Remote sources ────────────────────────────────────────────────────────────

/// Normalizes one raw remote-source record.
///
/// Returns `None` when the input is not an object, or when id, name, or url
/// is empty after cleaning.
pub fn normalize_remote_source(raw: &Value) -> Option<RemoteSource> {
    let obj = as_object(raw)?;

    let id = resolve_text(obj, ID_KEYS);
    let name = resolve_name(obj, NAME_KEYS);
    let url = resolve_text(obj, URL_KEYS);

    let (Some(id), Some(name), Some(url)) = (id, name, url) else {
        warn!("dropping remote source record missing id, name, or url");
        return None;
    };

    Some(RemoteSource {
        id,
        name,
        url,
        update_freq: resolve_raw_string(obj, UPDATE_FREQ_KEYS)
            .map(|v| UpdateFrequency::from_raw(&v))
            .unwrap_or_default(),
        last_updated_at: resolve_timestamp(obj, LAST_UPDATED_AT_KEYS),
        last_content: resolve_payload(obj, LAST_CONTENT_KEYS).unwrap_or_default(),
        status: resolve_raw_string(obj, STATUS_KEYS)
            .map(|v| FetchStatus::from_raw(&v))
            .unwrap_or_default(),
    })
}

/// Normalizes a raw remote-source list (array or bare object), dropping
/// rejects.
pub fn normalize_remote_sources(raw: &Value) -> Vec<RemoteSource> {
    each_candidate(raw, normalize_remote_source)
}

// ── Configurations ────────────────────────────────────────────────────────────

/// Normalizes one raw configuration record.
///
/// Returns `None` when the input is not an object, or when id or name is
/// empty after cleaning.
pub fn normalize_configuration(raw: &Value) -> Option<Configuration> {
    let obj = as_object(raw)?;

    let id = resolve_text(obj, ID_KEYS);
    let name = resolve_name(obj, NAME_KEYS);

    let (Some(id), Some(name)) = (id, name) else {
        warn!("dropping configuration record missing id or name");
        return None;
    };

    Some(Configuration {
        id,
        name,
        description: resolve_text(obj, DESCRIPTION_KEYS).unwrap_or_default(),
        content: resolve_payload(obj, CONTENT_KEYS).unwrap_or_default(),
        is_active: resolve_bool(obj, IS_ACTIVE_KEYS).unwrap_or(false),
        source: resolve_raw_string(obj, SOURCE_KEYS)
            .map(|v| ConfigSource::from_raw(&v))
            .unwrap_or_default(),
        remote_url: resolve_text(obj, REMOTE_URL_KEYS),
        created_at: resolve_timestamp(obj, CREATED_AT_KEYS),
        updated_at: resolve_timestamp(obj, UPDATED_AT_KEYS),
    })
}

/// Normalizes a raw configuration list (array or bare object), dropping
/// rejects.
pub fn normalize_configurations(raw: &Value) -> Vec<Configuration> {
    each_candidate(raw, normalize_configuration)
}

// ── Backups ───────────────────────────────────────────────────────────────────

/// Normalizes one raw backup record.
///
/// Returns `None` when the input is not an object or the id is empty after
/// cleaning.
pub fn normalize_backup(raw: &Value) -> Option<Backup> {
    let obj = as_object(raw)?;

    let Some(id) = resolve_text(obj, ID_KEYS) else {
        warn!("dropping backup record missing id");
        return None;
    };

    Some(Backup {
        id,
        timestamp: resolve_timestamp(obj, TIMESTAMP_KEYS),
        is_automatic: resolve_bool(obj, IS_AUTOMATIC_KEYS).unwrap_or(false),
        description: resolve_text(obj, DESCRIPTION_KEYS).unwrap_or_default(),
        tags: resolve_tags(obj, TAGS_KEYS),
        size: resolve_u64(obj, SIZE_KEYS).unwrap_or(0),
        content: resolve_payload(obj, CONTENT_KEYS).unwrap_or_default(),
        hash: resolve_text(obj, HASH_KEYS),
    })
}

/// Normalizes a raw backup list (array or bare object), dropping rejects.
pub fn normalize_backups(raw: &Value) -> Vec<Backup> {
    each_candidate(raw, normalize_backup)
}

// ── Shared sequencing rule ────────────────────────────────────────────────────

/// Applies a per-record normalizer to an array or a bare object.
///
/// A bare object is a one-element sequence; anything else (string, number,
/// null) normalizes to the empty list.
fn each_candidate<T>(raw: &Value, normalize_one: impl Fn(&Value) -> Option<T>) -> Vec<T> {
    match raw {
        Value::Array(items) => items.iter().filter_map(|v| normalize_one(v)).collect(),
        Value::Object(_) => normalize_one(raw).into_iter().collect(),
        _ => Vec::new(),
    }
}
