//! Content-addressed tree boundary for Folio.
//!
//! A [`Source`] provides the file tree entries are indexed from and accepts
//! batches of file-level [`Change`]s. Trees are identified by a content
//! hash: two trees with the same files and contents always share a sha,
//! which makes "did anything change" a single comparison.
//!
//! # Key Types
//!
//! - [`Tree`] -- flat listing of file path to content sha, itself hashed
//! - [`Change`] -- one file-level mutation (`Add` or `Delete`)
//! - [`Source`] -- the pluggable provider seam
//! - [`InMemorySource`] -- HashMap-backed source for tests and embedding
//! - [`SourceTransaction`] -- add/remove/rename batch against a base tree

pub mod change;
pub mod diff;
pub mod error;
pub mod memory;
pub mod source;
pub mod transaction;
pub mod tree;

pub use change::Change;
pub use diff::diff_trees;
pub use error::{SourceError, SourceResult};
pub use memory::InMemorySource;
pub use source::Source;
pub use transaction::{CompiledChanges, SourceTransaction};
pub use tree::Tree;
