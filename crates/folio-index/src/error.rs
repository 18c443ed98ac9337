//! Error types for the index crate.

use folio_types::{EntryId, EntryPhase};

/// A data-corruption signal: the tree violates one of the per-entry
/// invariants. These are never user errors; callers should log and halt the
/// affected operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    /// Two files claim the same `(id, locale, phase)` variant.
    #[error("duplicate {phase} variant for entry {id} (locale {locale:?})")]
    DuplicatePhase {
        id: EntryId,
        locale: Option<String>,
        phase: EntryPhase,
    },

    /// Variants of one id disagree on their type.
    #[error("entry {id} has conflicting types: {existing} vs {incoming}")]
    TypeMismatch {
        id: EntryId,
        existing: String,
        incoming: String,
    },

    /// Variants of one id disagree on their root.
    #[error("entry {id} has conflicting roots: {existing} vs {incoming}")]
    RootMismatch {
        id: EntryId,
        existing: String,
        incoming: String,
    },

    /// One id mixes localized and unlocalized variants.
    #[error("entry {id} mixes localized and unlocalized variants")]
    LocaleMixing { id: EntryId },

    /// Two sibling entries share a path.
    #[error("duplicate sibling path {path:?} under {dir:?}: entries {first} and {second}")]
    DuplicatePath {
        dir: String,
        path: String,
        first: EntryId,
        second: EntryId,
    },

    /// A non-draft child exists under a parent with no published variant.
    #[error("entry {id} has a {phase} variant but parent {parent} is not published")]
    ChildOfUnpublishedParent {
        id: EntryId,
        parent: EntryId,
        phase: EntryPhase,
    },
}

/// Errors from index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A file could not be parsed as an entry.
    ///
    /// Under the default [`crate::index::InvalidEntryPolicy::Skip`] policy
    /// this never escapes a sync; it is recorded in the sync report instead.
    #[error("invalid entry file {path}: {reason}")]
    InvalidEntry { path: String, reason: String },

    /// The tree violates an entry invariant.
    #[error("integrity violation: {0}")]
    Integrity(#[from] IntegrityError),

    /// Source operation failed.
    #[error("source error: {0}")]
    Source(#[from] folio_source::SourceError),

    /// Schema lookup failed.
    #[error("schema error: {0}")]
    Schema(#[from] folio_schema::SchemaError),

    /// Foundation type error.
    #[error(transparent)]
    Type(#[from] folio_types::TypeError),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
