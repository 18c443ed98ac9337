//! The Folio entry index.
//!
//! Builds and maintains the authoritative in-memory view of a content tree:
//! files are parsed into [`Entry`] revisions, aggregated per id into
//! [`EntryNode`]s, validated against the tree-wide invariants, and published
//! as an immutable sorted snapshot. Syncing is incremental (driven by tree
//! diffs or pre-computed change lists) and atomic. The index also carries
//! full-text search and a broadcast event stream for change notification.
//!
//! # Key Types
//!
//! - [`EntryIndex`] -- the index itself: sync, seed, find, filter, search
//! - [`Entry`] -- one phase and locale revision of a content node
//! - [`EntryNode`] / [`PhaseSet`] -- per-id variant aggregation
//! - [`IndexEvent`] -- change notifications over a broadcast channel
//! - [`IntegrityError`] -- fatal tree-invariant violations

pub mod entry;
pub mod error;
pub mod events;
pub mod index;
pub mod node;
pub mod search;

pub use entry::Entry;
pub use error::{IndexError, IndexResult, IntegrityError};
pub use events::{EventStream, IndexEvent};
pub use index::{
    EntryIndex, FilterOptions, IndexOptions, InvalidEntryPolicy, SkippedFile, SyncReport,
};
pub use node::{check_child_allowed, EntryNode, PhaseSet};
pub use search::SearchIndex;
