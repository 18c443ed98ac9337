use thiserror::Error;

#[derive(Debug, Error)]
pub enum FolioError {
    #[error("index error: {0}")]
    Index(#[from] folio_index::IndexError),

    #[error("transaction error: {0}")]
    Tx(#[from] folio_tx::TxError),

    #[error("query error: {0}")]
    Query(#[from] folio_query::QueryError),

    #[error("source error: {0}")]
    Source(#[from] folio_source::SourceError),
}

impl FolioError {
    /// Whether the error means another writer got there first and the
    /// operation should be retried on a fresh snapshot.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Tx(folio_tx::TxError::ShaMismatch { .. })
                | Self::Tx(folio_tx::TxError::CheckFailed { .. })
        )
    }
}

pub type FolioResult<T> = Result<T, FolioError>;
