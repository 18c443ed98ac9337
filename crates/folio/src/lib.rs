//! High-level API for Folio.
//!
//! Provides a unified entry point over the content source, the entry
//! index, snapshot-bound transactions, and the query resolver. This is
//! the main crate for applications embedding Folio.

pub mod error;
pub mod workspace;

pub use error::{FolioError, FolioResult};
pub use workspace::Folio;

// Re-export key types
pub use folio_types::{EntryId, EntryPhase, EntryRecord, FracKey, Sha};
pub use folio_schema::{
    Contains, FieldDef, FieldShape, RootConfig, Schema, SeedEntry, TypeDef, TypeKind,
    WorkspaceConfig,
};
pub use folio_source::{Change, InMemorySource, Source, SourceTransaction, Tree};
pub use folio_index::{Entry, EntryIndex, IndexEvent, IndexOptions, SyncReport};
pub use folio_tx::{
    AllowAll, CommitRequest, CreateEntry, EntryTransaction, InsertOrder, MoveEntry, Permission,
    Policy, UpdateEntry,
};
pub use folio_query::{
    Condition, Edge, EntryQuery, EntryResolver, FieldOp, OrderBy, StatusFilter,
};
