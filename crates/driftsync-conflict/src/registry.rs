//! Policy registry for conflict resolution
//!
//! Maps a document type to its default resolution policy. Built-in
//! defaults cover the known document types; YAML configuration can
//! override or extend them. Pure data lookup, no I/O.

use std::collections::HashMap;

use tracing::{debug, warn};

use driftsync_core::config::{ConflictsConfig, TypePolicy};
use driftsync_core::domain::{ConflictResolutionConfig, DocumentType, ResolutionStrategy};

use crate::error::ConflictError;

/// Registry of per-document-type resolution policies
pub struct ConflictRegistry {
    policies: HashMap<DocumentType, ConflictResolutionConfig>,
    fallback: ConflictResolutionConfig,
}

impl ConflictRegistry {
    /// Creates a registry with the built-in per-type defaults
    ///
    /// - `quiz` → auto-merge over content fields, keyed on `updatedAt`
    /// - `userProgress` → auto-merge over numeric progress fields
    /// - `question` → last-write-wins
    ///
    /// Unknown document types fall back to last-write-wins on `updatedAt`.
    pub fn with_defaults() -> Self {
        let mut policies = HashMap::new();

        policies.insert(
            DocumentType::Quiz,
            ConflictResolutionConfig::new(ResolutionStrategy::AutoMerge, "updatedAt")
                .with_auto_merge_fields(["title", "description", "timeLimit", "category", "tags"]),
        );
        policies.insert(
            DocumentType::UserProgress,
            ConflictResolutionConfig::new(ResolutionStrategy::AutoMerge, "updatedAt")
                .with_auto_merge_fields([
                    "totalQuizzesTaken",
                    "totalQuestionsAnswered",
                    "correctAnswers",
                    "currentStreak",
                    "bestStreak",
                ]),
        );
        policies.insert(
            DocumentType::Question,
            ConflictResolutionConfig::new(ResolutionStrategy::LastWriteWins, "updatedAt"),
        );

        Self {
            policies,
            fallback: ConflictResolutionConfig::new(ResolutionStrategy::LastWriteWins, "updatedAt"),
        }
    }

    /// Creates a registry from configuration overrides layered over the
    /// built-in defaults
    ///
    /// Invalid entries are logged and skipped.
    pub fn from_config(config: &ConflictsConfig) -> Self {
        let mut registry = Self::with_defaults();

        for policy in &config.policies {
            match compile_policy(policy) {
                Ok((document_type, compiled)) => {
                    debug!(
                        document_type = %document_type,
                        strategy = %compiled.strategy,
                        "Registering conflict policy override"
                    );
                    registry.policies.insert(document_type, compiled);
                }
                Err(err) => {
                    warn!(error = %err, "Skipping invalid conflict policy");
                }
            }
        }

        registry
    }

    /// Registers or replaces the policy for a document type
    pub fn register(&mut self, document_type: DocumentType, config: ConflictResolutionConfig) {
        self.policies.insert(document_type, config);
    }

    /// Returns the effective policy for a document type
    ///
    /// Unregistered types receive the fallback policy.
    pub fn config_for(&self, document_type: &DocumentType) -> &ConflictResolutionConfig {
        self.policies.get(document_type).unwrap_or(&self.fallback)
    }

    /// Returns the number of registered per-type policies
    pub fn policy_count(&self) -> usize {
        self.policies.len()
    }
}

impl Default for ConflictRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Validates a configured policy without registering it
///
/// Useful for eager config checking at startup.
pub fn validate_policy(policy: &TypePolicy) -> Result<(), ConflictError> {
    compile_policy(policy).map(|_| ())
}

fn compile_policy(
    policy: &TypePolicy,
) -> Result<(DocumentType, ConflictResolutionConfig), ConflictError> {
    let strategy: ResolutionStrategy =
        policy
            .strategy
            .parse()
            .map_err(|_| ConflictError::InvalidPolicy {
                document_type: policy.document_type.clone(),
                reason: format!(
                    "invalid strategy '{}'; valid: last-write-wins, first-write-wins, auto-merge, manual",
                    policy.strategy
                ),
            })?;

    if policy.timestamp_field.trim().is_empty() {
        return Err(ConflictError::InvalidPolicy {
            document_type: policy.document_type.clone(),
            reason: "timestamp_field must not be empty".to_string(),
        });
    }

    let config = ConflictResolutionConfig::new(strategy, policy.timestamp_field.clone())
        .with_auto_merge_fields(policy.auto_merge_fields.iter().cloned());

    Ok((DocumentType::from(policy.document_type.as_str()), config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(document_type: &str, strategy: &str) -> TypePolicy {
        TypePolicy {
            document_type: document_type.to_string(),
            strategy: strategy.to_string(),
            auto_merge_fields: Vec::new(),
            timestamp_field: "updatedAt".to_string(),
        }
    }

    #[test]
    fn test_defaults() {
        let registry = ConflictRegistry::with_defaults();

        let quiz = registry.config_for(&DocumentType::Quiz);
        assert_eq!(quiz.strategy, ResolutionStrategy::AutoMerge);
        assert!(quiz.is_auto_mergeable("title"));
        assert!(!quiz.is_auto_mergeable("questions"));

        let progress = registry.config_for(&DocumentType::UserProgress);
        assert_eq!(progress.strategy, ResolutionStrategy::AutoMerge);
        assert!(progress.is_auto_mergeable("currentStreak"));

        let question = registry.config_for(&DocumentType::Question);
        assert_eq!(question.strategy, ResolutionStrategy::LastWriteWins);
    }

    #[test]
    fn test_unknown_type_falls_back_to_last_write_wins() {
        let registry = ConflictRegistry::with_defaults();
        let config = registry.config_for(&DocumentType::Other("achievement".to_string()));

        assert_eq!(config.strategy, ResolutionStrategy::LastWriteWins);
        assert_eq!(config.timestamp_field, "updatedAt");
    }

    #[test]
    fn test_from_config_overrides_defaults() {
        let config = ConflictsConfig {
            policies: vec![TypePolicy {
                document_type: "quiz".to_string(),
                strategy: "manual".to_string(),
                auto_merge_fields: Vec::new(),
                timestamp_field: "updatedAt".to_string(),
            }],
        };

        let registry = ConflictRegistry::from_config(&config);
        assert_eq!(
            registry.config_for(&DocumentType::Quiz).strategy,
            ResolutionStrategy::Manual
        );
    }

    #[test]
    fn test_from_config_skips_invalid_entries() {
        let config = ConflictsConfig {
            policies: vec![
                policy("quiz", "not-a-strategy"),
                policy("achievement", "first-write-wins"),
            ],
        };

        let registry = ConflictRegistry::from_config(&config);
        // Invalid override skipped: quiz keeps its default
        assert_eq!(
            registry.config_for(&DocumentType::Quiz).strategy,
            ResolutionStrategy::AutoMerge
        );
        // Valid extension registered
        assert_eq!(
            registry
                .config_for(&DocumentType::Other("achievement".to_string()))
                .strategy,
            ResolutionStrategy::FirstWriteWins
        );
    }

    #[test]
    fn test_validate_policy() {
        assert!(validate_policy(&policy("quiz", "auto-merge")).is_ok());
        assert!(matches!(
            validate_policy(&policy("quiz", "yolo")),
            Err(ConflictError::InvalidPolicy { .. })
        ));

        let mut bad_ts = policy("quiz", "auto-merge");
        bad_ts.timestamp_field = "  ".to_string();
        assert!(validate_policy(&bad_ts).is_err());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = ConflictRegistry::with_defaults();
        registry.register(
            DocumentType::Question,
            ConflictResolutionConfig::new(ResolutionStrategy::Manual, "updatedAt"),
        );
        assert_eq!(
            registry.config_for(&DocumentType::Question).strategy,
            ResolutionStrategy::Manual
        );
    }
}
