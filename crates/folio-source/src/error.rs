//! Error types for the source crate.

use folio_types::Sha;

/// Errors from tree and source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The path does not exist in the tree.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// The path already exists in the tree.
    #[error("path already exists: {0}")]
    PathExists(String),

    /// A blob referenced by the tree was not found in content storage.
    #[error("blob not found: {0}")]
    BlobNotFound(Sha),

    /// A change asserted a file hash that no longer matches the tree.
    #[error("stale change for {path}: expected {expected}, found {actual}")]
    StaleChange {
        path: String,
        expected: Sha,
        actual: Sha,
    },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias for source results.
pub type SourceResult<T> = Result<T, SourceError>;
