//! Error types for the transaction crate.

use folio_types::{EntryId, EntryPhase, Sha};

use crate::policy::Permission;

/// Errors from building or applying entry transactions.
#[derive(Debug, thiserror::Error)]
pub enum TxError {
    /// The transaction's base snapshot no longer matches the index. Always
    /// recoverable: retry against a fresh snapshot.
    #[error("tree moved: expected sha {expected}, found {actual}")]
    ShaMismatch { expected: Sha, actual: Sha },

    /// A per-file check failed at apply time. The null sha stands for
    /// "file must be absent".
    #[error("check failed for {path}: expected {expected}, found {actual}")]
    CheckFailed {
        path: String,
        expected: Sha,
        actual: Sha,
    },

    /// The policy denied an operation.
    #[error("permission denied: {permission}{}", subject.as_ref().map(|s| format!(" on {s}")).unwrap_or_default())]
    PermissionDenied {
        permission: Permission,
        subject: Option<EntryId>,
    },

    /// No entry with this id (and locale) exists in the bound snapshot.
    #[error("entry {id} not found{}", locale.as_ref().map(|l| format!(" for locale {l}")).unwrap_or_default())]
    EntryNotFound {
        id: EntryId,
        locale: Option<String>,
    },

    /// The entry exists but lacks the phase the operation needs.
    #[error("entry {id} has no {phase} variant")]
    VariantNotFound { id: EntryId, phase: EntryPhase },

    /// A staged file path is already taken.
    #[error("path already exists: {0}")]
    PathTaken(String),

    /// A staged operation targets a missing file.
    #[error("path not found: {0}")]
    PathMissing(String),

    /// The container contract rejects this nesting.
    #[error("type {parent_type} does not admit children of type {child_type}")]
    ChildNotAllowed {
        parent_type: String,
        child_type: String,
    },

    /// A move would place an entry inside its own subtree.
    #[error("cannot move entry {0} into its own subtree")]
    MoveIntoOwnSubtree(EntryId),

    /// The staged changes would violate a tree invariant.
    #[error("integrity violation: {0}")]
    Integrity(#[from] folio_index::IntegrityError),

    /// Schema lookup or locale validation failed.
    #[error("schema error: {0}")]
    Schema(#[from] folio_schema::SchemaError),

    /// Source operation failed.
    #[error("source error: {0}")]
    Source(#[from] folio_source::SourceError),

    /// Foundation type error.
    #[error(transparent)]
    Type(#[from] folio_types::TypeError),
}

/// Convenience alias for transaction results.
pub type TxResult<T> = Result<T, TxError>;
