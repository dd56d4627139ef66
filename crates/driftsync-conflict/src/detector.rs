//! Conflict detection logic
//!
//! Determines which fields of two document snapshots have diverged by
//! structural comparison.

use driftsync_core::domain::FieldMap;
use tracing::trace;

/// Detects field-level conflicts between document snapshots
pub struct ConflictDetector;

impl ConflictDetector {
    /// Returns the names of fields defined on both sides with deeply
    /// unequal values
    ///
    /// A field is reported iff **both** snapshots define the key (a JSON
    /// `null` value counts as defined) and the values are not structurally
    /// equal. A field present on only one side is an addition, not a
    /// conflict. Fields listed in `exclude_fields` (typically the
    /// timestamp field) are never reported even if they differ.
    ///
    /// Output order follows the local snapshot's key order, so results
    /// are deterministic. Comparison is purely structural
    /// (`serde_json::Value` equality) and cannot fail.
    pub fn detect(local: &FieldMap, remote: &FieldMap, exclude_fields: &[&str]) -> Vec<String> {
        let mut conflicting = Vec::new();

        for (field, local_value) in local {
            if exclude_fields.contains(&field.as_str()) {
                continue;
            }
            let Some(remote_value) = remote.get(field) else {
                continue;
            };
            if local_value != remote_value {
                conflicting.push(field.clone());
            }
        }

        trace!(
            conflicts = conflicting.len(),
            fields = ?conflicting,
            "Conflict detection completed"
        );

        conflicting
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> FieldMap {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn test_no_conflicts_when_equal() {
        let local = fields(json!({"title": "Quiz", "timeLimit": 30}));
        let remote = fields(json!({"title": "Quiz", "timeLimit": 30}));

        assert!(ConflictDetector::detect(&local, &remote, &[]).is_empty());
    }

    #[test]
    fn test_detects_differing_fields() {
        let local = fields(json!({"title": "Local", "description": "Same", "timeLimit": 30}));
        let remote = fields(json!({"title": "Remote", "description": "Same", "timeLimit": 60}));

        let conflicts = ConflictDetector::detect(&local, &remote, &[]);
        assert_eq!(conflicts, vec!["timeLimit".to_string(), "title".to_string()]);
    }

    #[test]
    fn test_field_on_one_side_is_not_a_conflict() {
        let local = fields(json!({"title": "Quiz"}));
        let remote = fields(json!({"title": "Quiz", "category": "math"}));

        assert!(ConflictDetector::detect(&local, &remote, &[]).is_empty());
        assert!(ConflictDetector::detect(&remote, &local, &[]).is_empty());
    }

    #[test]
    fn test_null_counts_as_defined() {
        let local = fields(json!({"category": null}));
        let remote = fields(json!({"category": "math"}));

        let conflicts = ConflictDetector::detect(&local, &remote, &[]);
        assert_eq!(conflicts, vec!["category".to_string()]);
    }

    #[test]
    fn test_both_null_is_not_a_conflict() {
        let local = fields(json!({"category": null}));
        let remote = fields(json!({"category": null}));

        assert!(ConflictDetector::detect(&local, &remote, &[]).is_empty());
    }

    #[test]
    fn test_nested_structures_compared_structurally() {
        let local = fields(json!({"settings": {"shuffle": true, "limits": [1, 2, 3]}}));
        let same = fields(json!({"settings": {"shuffle": true, "limits": [1, 2, 3]}}));
        let different = fields(json!({"settings": {"shuffle": true, "limits": [1, 2, 4]}}));

        assert!(ConflictDetector::detect(&local, &same, &[]).is_empty());
        assert_eq!(
            ConflictDetector::detect(&local, &different, &[]),
            vec!["settings".to_string()]
        );
    }

    #[test]
    fn test_excluded_fields_never_reported() {
        let local = fields(json!({"title": "Local", "updatedAt": "2024-01-02T00:00:00Z"}));
        let remote = fields(json!({"title": "Remote", "updatedAt": "2024-01-01T00:00:00Z"}));

        let conflicts = ConflictDetector::detect(&local, &remote, &["updatedAt"]);
        assert_eq!(conflicts, vec!["title".to_string()]);

        let conflicts = ConflictDetector::detect(&local, &remote, &["updatedAt", "title"]);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_symmetry_of_difference() {
        let local = fields(json!({"a": 1, "b": "x", "c": true}));
        let remote = fields(json!({"a": 2, "b": "x", "d": false}));

        let forward = ConflictDetector::detect(&local, &remote, &[]);
        let backward = ConflictDetector::detect(&remote, &local, &[]);

        assert_eq!(forward, vec!["a".to_string()]);
        assert_eq!(backward, vec!["a".to_string()]);
    }
}
