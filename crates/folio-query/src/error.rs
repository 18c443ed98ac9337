//! Error types for the query crate.

use folio_types::EntryId;

/// Errors from resolving queries.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The query names an entry that does not exist in the snapshot.
    #[error("anchor entry {0} not found")]
    AnchorNotFound(EntryId),

    /// A link field carried a value that is not a reference id.
    #[error("field {field} does not hold a reference: {reason}")]
    InvalidReference { field: String, reason: String },

    /// Schema lookup failed.
    #[error("schema error: {0}")]
    Schema(#[from] folio_schema::SchemaError),

    /// Foundation type error.
    #[error(transparent)]
    Type(#[from] folio_types::TypeError),
}

/// Convenience alias for query results.
pub type QueryResult<T> = Result<T, QueryError>;
