//! Field resolution and cleaning primitives for the normalizer.
//!
//! Raw records reach the UI with keys spelled several ways, depending on
//! which backend version wrote them (`id`/`ID`, `updateFreq`/`update_freq`,
//! timestamps as plain strings or wrapped in `{"Time": "…"}`).  Each helper
//! here walks an explicit, ordered alias list — canonical spelling first —
//! and returns the first usable value, leaving the caller to apply a default.
//!
//! All functions are pure and total: bad input yields `None`, never a panic.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

/// Upper bound on name-like fields, in characters.  Bounds storage and
/// display regardless of what the backend sent.
pub(crate) const MAX_NAME_LEN: usize = 100;

/// Fallback timestamp formats accepted from legacy backends, tried after
/// RFC 3339.  Both are parsed as naive local-less times and taken as UTC.
const LEGACY_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Views a raw value as a JSON object, if it is one.
pub(crate) fn as_object(raw: &Value) -> Option<&Map<String, Value>> {
    raw.as_object()
}

/// Resolves a string field through the alias list.
///
/// The first key holding a non-empty string (after trimming) wins; numeric
/// values are stringified, matching how duck-typed frontends coerced them.
/// Returns the raw matched text without any cleaning.
pub(crate) fn resolve_raw_string(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        match obj.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => continue,
        }
    }
    None
}

/// Resolves a scalar text field: alias walk, then trim and control strip.
pub(crate) fn resolve_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let cleaned = clean_text(&resolve_raw_string(obj, keys)?);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Resolves a name-like field: as [`resolve_text`], plus the length cap.
pub(crate) fn resolve_name(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    let cleaned = clean_name(&resolve_raw_string(obj, keys)?);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Resolves a multi-line payload field (hosts text).  Taken verbatim —
/// trimming or control stripping would corrupt the payload's newlines.
pub(crate) fn resolve_payload(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(Value::String(s)) = obj.get(*key) {
            if !s.is_empty() {
                return Some(s.clone());
            }
        }
    }
    None
}

/// Resolves a boolean field.  Accepts real booleans plus the textual
/// `"true"`/`"false"` a legacy serializer produced.
pub(crate) fn resolve_bool(obj: &Map<String, Value>, keys: &[&str]) -> Option<bool> {
    for key in keys {
        match obj.get(*key) {
            Some(Value::Bool(b)) => return Some(*b),
            Some(Value::String(s)) => match s.trim() {
                "true" => return Some(true),
                "false" => return Some(false),
                _ => continue,
            },
            _ => continue,
        }
    }
    None
}

/// Resolves a non-negative integer field.  Accepts numbers and numeric
/// strings; negative or fractional values are ignored.
pub(crate) fn resolve_u64(obj: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    for key in keys {
        match obj.get(*key) {
            Some(Value::Number(n)) => {
                if let Some(v) = n.as_u64() {
                    return Some(v);
                }
            }
            Some(Value::String(s)) => {
                if let Ok(v) = s.trim().parse::<u64>() {
                    return Some(v);
                }
            }
            _ => continue,
        }
    }
    None
}

/// Resolves a timestamp field.
///
/// The value may be a bare string or the legacy wrapper object
/// `{"Time": "…"}`.  Unparseable or empty values resolve to `None`, which
/// downstream ordering treats as oldest.
pub(crate) fn resolve_timestamp(obj: &Map<String, Value>, keys: &[&str]) -> Option<DateTime<Utc>> {
    for key in keys {
        let candidate = match obj.get(*key) {
            Some(Value::String(s)) => Some(s.as_str()),
            Some(Value::Object(wrapper)) => wrapper.get("Time").and_then(Value::as_str),
            _ => None,
        };
        if let Some(parsed) = candidate.and_then(parse_timestamp) {
            return Some(parsed);
        }
    }
    None
}

/// Resolves a string-array field, cleaning each entry and deduplicating
/// while preserving first-seen order.
pub(crate) fn resolve_tags(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    for key in keys {
        if let Some(Value::Array(items)) = obj.get(*key) {
            let mut tags: Vec<String> = Vec::new();
            for item in items {
                if let Value::String(s) = item {
                    let cleaned = clean_name(s);
                    if !cleaned.is_empty() && !tags.contains(&cleaned) {
                        tags.push(cleaned);
                    }
                }
            }
            return tags;
        }
    }
    Vec::new()
}

/// Trims and strips C0 control characters and DEL.
pub(crate) fn clean_text(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !c.is_ascii_control())
        .collect()
}

/// [`clean_text`] plus the [`MAX_NAME_LEN`] cap.
pub(crate) fn clean_name(raw: &str) -> String {
    clean_text(raw).chars().take(MAX_NAME_LEN).collect()
}

/// Parses one of the accepted textual timestamp shapes into UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    // RFC 3339 covers the current backend, fractional seconds included.
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Legacy zone-less shapes.
    for format in LEGACY_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_canonical_key_wins_over_alias_when_both_present() {
        let record = obj(json!({"id": "canonical", "ID": "legacy"}));
        assert_eq!(
            resolve_text(&record, &["id", "ID"]),
            Some("canonical".to_string())
        );
    }

    #[test]
    fn test_empty_canonical_value_falls_through_to_alias() {
        let record = obj(json!({"id": "  ", "ID": "legacy"}));
        assert_eq!(
            resolve_text(&record, &["id", "ID"]),
            Some("legacy".to_string())
        );
    }

    #[test]
    fn test_numbers_are_stringified() {
        let record = obj(json!({"id": 42}));
        assert_eq!(resolve_text(&record, &["id"]), Some("42".to_string()));
    }

    #[test]
    fn test_clean_text_strips_control_characters_and_trims() {
        assert_eq!(clean_text("  a\x00b\x1fc\x7fd  "), "abcd");
        assert_eq!(clean_text("plain"), "plain");
    }

    #[test]
    fn test_clean_name_caps_length_at_char_boundary() {
        let long: String = "é".repeat(150);
        let cleaned = clean_name(&long);
        assert_eq!(cleaned.chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn test_resolve_payload_preserves_newlines() {
        let record = obj(json!({"content": "127.0.0.1 a\n::1 b\n"}));
        assert_eq!(
            resolve_payload(&record, &["content"]),
            Some("127.0.0.1 a\n::1 b\n".to_string())
        );
    }

    #[test]
    fn test_resolve_bool_accepts_textual_booleans() {
        let record = obj(json!({"isActive": "true", "is_active": false}));
        assert_eq!(resolve_bool(&record, &["isActive", "is_active"]), Some(true));
    }

    #[test]
    fn test_resolve_u64_accepts_numeric_strings_and_rejects_negatives() {
        assert_eq!(resolve_u64(&obj(json!({"size": "4096"})), &["size"]), Some(4096));
        assert_eq!(resolve_u64(&obj(json!({"size": -5})), &["size"]), None);
    }

    #[test]
    fn test_parse_timestamp_accepts_rfc3339_variants() {
        assert!(parse_timestamp("2024-05-01T10:20:30Z").is_some());
        assert!(parse_timestamp("2024-05-01T10:20:30.123456789Z").is_some());
        assert!(parse_timestamp("2024-05-01T10:20:30+08:00").is_some());
    }

    #[test]
    fn test_parse_timestamp_accepts_legacy_zone_less_shapes() {
        assert!(parse_timestamp("2024-05-01T10:20:30").is_some());
        assert!(parse_timestamp("2024-05-01 10:20:30").is_some());
    }

    #[test]
    fn test_parse_timestamp_rejects_empty_and_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("   ").is_none());
        assert!(parse_timestamp("not a time").is_none());
    }

    #[test]
    fn test_resolve_timestamp_unwraps_legacy_time_wrapper() {
        let record = obj(json!({"updatedAt": {"Time": "2024-05-01T10:20:30Z"}}));
        assert!(resolve_timestamp(&record, &["updatedAt"]).is_some());
    }

    #[test]
    fn test_resolve_tags_cleans_and_dedups_preserving_order() {
        let record = obj(json!({"tags": [" prod ", "dns", "prod", "", 7]}));
        assert_eq!(
            resolve_tags(&record, &["tags"]),
            vec!["prod".to_string(), "dns".to_string()]
        );
    }
}
