//! Conflict resolution orchestrator
//!
//! Selects the effective policy for a conflict (caller override or
//! registry lookup) and dispatches to the matching strategy. This is the
//! single public entry point: strategies are not callable directly by
//! application code.

use tracing::{debug, info};

use driftsync_core::domain::{
    ConflictResolutionConfig, ConflictResolutionResult, DocumentConflict, ResolutionStrategy,
};

use crate::registry::ConflictRegistry;
use crate::strategy;

/// Orchestrates conflict resolution over the policy registry
pub struct ConflictResolver {
    registry: ConflictRegistry,
}

impl ConflictResolver {
    /// Creates a resolver over the given registry
    pub fn new(registry: ConflictRegistry) -> Self {
        Self { registry }
    }

    /// Creates a resolver over the built-in default policies
    pub fn with_defaults() -> Self {
        Self::new(ConflictRegistry::with_defaults())
    }

    /// Returns the underlying registry
    pub fn registry(&self) -> &ConflictRegistry {
        &self.registry
    }

    /// Resolves a conflict according to per-type policy
    ///
    /// The effective config is `config_override` when given, else the
    /// registry's policy for `conflict.document_type`. The result is
    /// stamped with the strategy that actually ran.
    ///
    /// An unresolved outcome is a typed result, never an error: when
    /// `requires_user_input()` is true the caller must collect a user
    /// decision over `local_version`/`remote_version` (and `base_version`
    /// if any) and persist the choice itself.
    pub fn resolve(
        &self,
        conflict: &DocumentConflict,
        config_override: Option<&ConflictResolutionConfig>,
    ) -> ConflictResolutionResult {
        let config = config_override
            .unwrap_or_else(|| self.registry.config_for(&conflict.document_type));

        debug!(
            document_type = %conflict.document_type,
            document_id = %conflict.document_id,
            strategy = %config.strategy,
            has_base = conflict.base_version.is_some(),
            "Resolving conflict"
        );

        let result = match config.strategy {
            ResolutionStrategy::FirstWriteWins => {
                strategy::first_write_wins(&conflict.remote_version)
            }
            ResolutionStrategy::LastWriteWins => {
                strategy::last_write_wins(&conflict.local_version, &conflict.remote_version, config)
            }
            ResolutionStrategy::AutoMerge => strategy::auto_merge(
                &conflict.local_version,
                &conflict.remote_version,
                config,
                conflict.base_version.as_ref(),
            ),
            ResolutionStrategy::Manual => strategy::manual(),
        };

        info!(
            document_type = %conflict.document_type,
            document_id = %conflict.document_id,
            strategy = %result.strategy(),
            resolved = result.is_resolved(),
            requires_user_input = result.requires_user_input(),
            "Conflict resolution completed"
        );

        result
    }
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::with_defaults()
    }
}
