//! Document conflict domain entities
//!
//! This module defines the types exchanged with the conflict engine:
//! document type tags, conflict descriptions, resolution policies, and
//! resolution results.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{DocumentId, UserId};

/// A document snapshot: an arbitrary keyed field map
///
/// `serde_json::Value` equality is structural, so two snapshots compare
/// deeply without any custom traversal.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// DocumentType
// ============================================================================

/// Type tag of a document, selecting its resolution policy
///
/// Known types are enumerated explicitly so new document kinds are
/// compile-time visible; anything else falls through the `Other` arm and
/// receives the registry's fallback policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DocumentType {
    /// A quiz definition (title, description, questions metadata)
    Quiz,
    /// A per-user progress record (counters, streaks)
    UserProgress,
    /// A single question document
    Question,
    /// Any unregistered document type
    Other(String),
}

impl DocumentType {
    /// Returns the wire tag for this document type
    pub fn as_str(&self) -> &str {
        match self {
            DocumentType::Quiz => "quiz",
            DocumentType::UserProgress => "userProgress",
            DocumentType::Question => "question",
            DocumentType::Other(tag) => tag,
        }
    }
}

impl From<String> for DocumentType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "quiz" => DocumentType::Quiz,
            "userProgress" => DocumentType::UserProgress,
            "question" => DocumentType::Question,
            _ => DocumentType::Other(s),
        }
    }
}

impl From<&str> for DocumentType {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<DocumentType> for String {
    fn from(t: DocumentType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ResolutionStrategy
// ============================================================================

/// The named resolution policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// The side with the newer timestamp wins whole
    LastWriteWins,
    /// The already-committed remote version wins whole
    FirstWriteWins,
    /// Field-level three-way merge with an allow-list for colliding fields
    AutoMerge,
    /// No computation; a human must choose
    Manual,
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResolutionStrategy::LastWriteWins => "last-write-wins",
            ResolutionStrategy::FirstWriteWins => "first-write-wins",
            ResolutionStrategy::AutoMerge => "auto-merge",
            ResolutionStrategy::Manual => "manual",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ResolutionStrategy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last-write-wins" => Ok(ResolutionStrategy::LastWriteWins),
            "first-write-wins" => Ok(ResolutionStrategy::FirstWriteWins),
            "auto-merge" => Ok(ResolutionStrategy::AutoMerge),
            "manual" => Ok(ResolutionStrategy::Manual),
            other => Err(DomainError::InvalidStrategy(other.to_string())),
        }
    }
}

// ============================================================================
// ConflictResolutionConfig
// ============================================================================

/// Resolution policy for one document type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictResolutionConfig {
    /// Which strategy resolves conflicts for this type
    pub strategy: ResolutionStrategy,
    /// Fields eligible for silent per-field reconciliation under
    /// `auto-merge`; a field not listed here is NOT auto-mergeable
    #[serde(default)]
    pub auto_merge_fields: BTreeSet<String>,
    /// Name of the field holding last-modified time, used by
    /// `last-write-wins` and the per-field tie-break inside `auto-merge`
    pub timestamp_field: String,
}

impl ConflictResolutionConfig {
    /// Creates a config with no auto-mergeable fields
    pub fn new(strategy: ResolutionStrategy, timestamp_field: impl Into<String>) -> Self {
        Self {
            strategy,
            auto_merge_fields: BTreeSet::new(),
            timestamp_field: timestamp_field.into(),
        }
    }

    /// Sets the auto-mergeable field allow-list
    pub fn with_auto_merge_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auto_merge_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if the named field may be reconciled silently
    pub fn is_auto_mergeable(&self, field: &str) -> bool {
        self.auto_merge_fields.contains(field)
    }
}

// ============================================================================
// DocumentConflict
// ============================================================================

/// A detected divergence between a local draft and a remote snapshot
///
/// Produced by the host sync layer when a write discovers the server copy
/// has moved; consumed by the conflict orchestrator. `conflicting_fields`
/// is advisory input only — strategies recompute differences themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentConflict {
    /// Type tag selecting the resolution policy
    pub document_type: DocumentType,
    /// Identifier of the diverged document
    pub document_id: DocumentId,
    /// The locally-held version
    pub local_version: FieldMap,
    /// The version currently on the server
    pub remote_version: FieldMap,
    /// Last known common ancestor, if the caller can supply one
    pub base_version: Option<FieldMap>,
    /// When the local version was last modified
    pub local_timestamp: DateTime<Utc>,
    /// When the remote version was last modified
    pub remote_timestamp: DateTime<Utc>,
    /// Advisory list of fields the caller believes conflict
    pub conflicting_fields: Vec<String>,
    /// The user whose edit produced the local version
    pub user_id: UserId,
}

impl DocumentConflict {
    /// Creates a conflict description with no base version
    pub fn new(
        document_type: DocumentType,
        document_id: DocumentId,
        local_version: FieldMap,
        remote_version: FieldMap,
        user_id: UserId,
    ) -> Self {
        let now = Utc::now();
        Self {
            document_type,
            document_id,
            local_version,
            remote_version,
            base_version: None,
            local_timestamp: now,
            remote_timestamp: now,
            conflicting_fields: Vec::new(),
            user_id,
        }
    }

    /// Attaches the last known common ancestor, enabling true 3-way merge
    pub fn with_base_version(mut self, base: FieldMap) -> Self {
        self.base_version = Some(base);
        self
    }

    /// Sets the per-side modification timestamps
    pub fn with_timestamps(mut self, local: DateTime<Utc>, remote: DateTime<Utc>) -> Self {
        self.local_timestamp = local;
        self.remote_timestamp = remote;
        self
    }

    /// Sets the advisory conflicting-field list
    pub fn with_conflicting_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conflicting_fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

// ============================================================================
// ConflictResolutionResult
// ============================================================================

/// Outcome of running a resolution strategy
///
/// The invariant `resolved == false` implies `merged_data` is absent and
/// `requires_user_input == true` is enforced by construction: the only
/// constructors are [`resolved`](ConflictResolutionResult::resolved) and
/// [`unresolved`](ConflictResolutionResult::unresolved). There is no
/// silent-drop outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictResolutionResult {
    resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    merged_data: Option<FieldMap>,
    requires_user_input: bool,
    strategy: ResolutionStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ConflictResolutionResult {
    /// A successful resolution carrying the merged document
    pub fn resolved(merged_data: FieldMap, strategy: ResolutionStrategy) -> Self {
        Self {
            resolved: true,
            merged_data: Some(merged_data),
            requires_user_input: false,
            strategy,
            error: None,
        }
    }

    /// An unresolved outcome: a human must choose
    pub fn unresolved(strategy: ResolutionStrategy) -> Self {
        Self {
            resolved: false,
            merged_data: None,
            requires_user_input: true,
            strategy,
            error: None,
        }
    }

    /// Attaches a diagnostic message to an outcome
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Whether the conflict was resolved without human input
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// The merged document, present iff resolved
    pub fn merged_data(&self) -> Option<&FieldMap> {
        self.merged_data.as_ref()
    }

    /// Consumes the result, returning the merged document if any
    pub fn into_merged_data(self) -> Option<FieldMap> {
        self.merged_data
    }

    /// Whether a human must choose between the versions
    pub fn requires_user_input(&self) -> bool {
        self.requires_user_input
    }

    /// The policy that actually ran
    pub fn strategy(&self) -> ResolutionStrategy {
        self.strategy
    }

    /// Diagnostic message, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
