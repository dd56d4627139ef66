//! Resolution strategy implementations
//!
//! All strategies consume `(local, remote, config, base)` and produce a
//! [`ConflictResolutionResult`]. They are crate-private: application code
//! goes through [`ConflictResolver`](crate::resolver::ConflictResolver),
//! which selects the policy and dispatches here.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use driftsync_core::domain::{ConflictResolutionConfig, ConflictResolutionResult, FieldMap, ResolutionStrategy};

/// The server's already-committed value must never be overwritten by a
/// late local write: the remote snapshot is returned whole.
pub(crate) fn first_write_wins(remote: &FieldMap) -> ConflictResolutionResult {
    ConflictResolutionResult::resolved(remote.clone(), ResolutionStrategy::FirstWriteWins)
}

/// The side with the strictly greater timestamp is returned whole.
///
/// Missing or unparsable timestamps on either side default to local: the
/// caller's own pending edit wins the tie-break, deterministically.
pub(crate) fn last_write_wins(
    local: &FieldMap,
    remote: &FieldMap,
    config: &ConflictResolutionConfig,
) -> ConflictResolutionResult {
    let merged = if remote_is_newer(local, remote, &config.timestamp_field) {
        remote.clone()
    } else {
        local.clone()
    };
    ConflictResolutionResult::resolved(merged, ResolutionStrategy::LastWriteWins)
}

/// Field-level merge: 3-way against `base` when supplied, 2-way fallback
/// otherwise.
///
/// One-side changes are taken as-is. Both-side changes to the same field
/// resolve per-field by the last-write-wins timestamp comparison when the
/// field is on the `auto_merge_fields` allow-list; a single collision
/// outside the allow-list aborts the whole merge. Without a base version,
/// "changed" collapses to "differs", so every differing field counts as
/// changed on both sides.
///
/// The timestamp field itself is exempt from per-field conflict checks
/// (it differs whenever either side was edited); the merged snapshot
/// carries the newer of the two timestamp values.
pub(crate) fn auto_merge(
    local: &FieldMap,
    remote: &FieldMap,
    config: &ConflictResolutionConfig,
    base: Option<&FieldMap>,
) -> ConflictResolutionResult {
    let ts_field = config.timestamp_field.as_str();
    let mut merged = match base {
        Some(b) => b.clone(),
        None => remote.clone(),
    };

    let mut fields: Vec<&String> = local.keys().chain(remote.keys()).collect();
    fields.sort();
    fields.dedup();

    for field in fields {
        if field == ts_field {
            continue;
        }

        let local_value = local.get(field.as_str());
        let remote_value = remote.get(field.as_str());

        let (local_changed, remote_changed) = match base {
            Some(b) => {
                let base_value = b.get(field.as_str());
                (local_value != base_value, remote_value != base_value)
            }
            None => (local_value != remote_value, remote_value != local_value),
        };

        match (local_changed, remote_changed) {
            (false, false) => {
                // All sides agree; with a base the cloned ancestor already
                // carries the value.
                if base.is_none() {
                    apply(&mut merged, field, remote_value);
                }
            }
            (true, false) => apply(&mut merged, field, local_value),
            (false, true) => apply(&mut merged, field, remote_value),
            (true, true) => {
                if local_value == remote_value {
                    // Both sides converged on the same new value.
                    apply(&mut merged, field, local_value);
                    continue;
                }
                if !config.is_auto_mergeable(field) {
                    debug!(
                        field = %field,
                        "Field changed on both sides and is not auto-mergeable, merge requires user input"
                    );
                    return ConflictResolutionResult::unresolved(ResolutionStrategy::AutoMerge)
                        .with_error(format!("field '{field}' changed on both sides"));
                }
                if remote_is_newer(local, remote, ts_field) {
                    apply(&mut merged, field, remote_value);
                } else {
                    apply(&mut merged, field, local_value);
                }
            }
        }
    }

    let ts_value = if remote_is_newer(local, remote, ts_field) {
        remote.get(ts_field).or_else(|| local.get(ts_field))
    } else {
        local.get(ts_field).or_else(|| remote.get(ts_field))
    };
    if let Some(value) = ts_value {
        merged.insert(ts_field.to_string(), value.clone());
    }

    ConflictResolutionResult::resolved(merged, ResolutionStrategy::AutoMerge)
}

/// No computation: the caller must collect a user decision and persist
/// the outcome itself.
pub(crate) fn manual() -> ConflictResolutionResult {
    ConflictResolutionResult::unresolved(ResolutionStrategy::Manual)
}

/// Writes `value` into `merged`, treating `None` as a deletion
fn apply(merged: &mut FieldMap, field: &str, value: Option<&Value>) {
    match value {
        Some(v) => {
            merged.insert(field.to_string(), v.clone());
        }
        None => {
            merged.remove(field);
        }
    }
}

/// True iff both timestamps parse and remote is strictly newer
fn remote_is_newer(local: &FieldMap, remote: &FieldMap, ts_field: &str) -> bool {
    match (
        local.get(ts_field).and_then(parse_timestamp),
        remote.get(ts_field).and_then(parse_timestamp),
    ) {
        (Some(local_ts), Some(remote_ts)) => remote_ts > local_ts,
        _ => false,
    }
}

/// Parses a document timestamp field as a time value
///
/// Accepts RFC 3339 strings, naive `YYYY-MM-DDTHH:MM:SS` strings, and
/// numeric epoch values (seconds, or milliseconds when the magnitude
/// says so).
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                    .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
                    .map(|ndt| ndt.and_utc())
                    .ok()
            }),
        Value::Number(n) => {
            let millis = n.as_i64()?;
            if millis.abs() >= 100_000_000_000 {
                DateTime::from_timestamp_millis(millis)
            } else {
                DateTime::from_timestamp(millis, 0)
            }
        }
        _ => None,
    }
}
