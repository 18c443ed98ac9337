use folio_types::Sha;

use crate::change::Change;
use crate::error::SourceResult;
use crate::tree::Tree;

/// The pluggable content provider seam.
///
/// All implementations must satisfy these invariants:
/// - Blobs are immutable once written; content-addressing guarantees that
///   the same bytes always carry the same sha.
/// - `apply` is atomic: either every change lands and the new tree is
///   returned, or the tree is left untouched and an error is returned.
/// - `apply` verifies the sha carried by each `Delete` against the current
///   tree, so stale batches fail instead of clobbering newer content.
/// - Concurrent reads are always safe.
pub trait Source: Send + Sync {
    /// The current tree.
    fn tree(&self) -> SourceResult<Tree>;

    /// Read file contents by content sha.
    ///
    /// Returns `Ok(None)` if the blob is unknown.
    fn read(&self, sha: &Sha) -> SourceResult<Option<Vec<u8>>>;

    /// Apply a batch of changes, returning the new tree.
    fn apply(&self, changes: &[Change]) -> SourceResult<Tree>;
}
