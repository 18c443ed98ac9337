//! Declarative queries over the Folio entry index.
//!
//! An [`EntryQuery`] describes what to fetch: scope (types, root, locale,
//! phase), a [`Condition`] filter tree, full-text search, a graph [`Edge`]
//! relative to an anchor entry, ordering, grouping, paging, and projection.
//! The [`EntryResolver`] executes it against an index snapshot and expands
//! reference fields through a [`LinkResolver`].
//!
//! # Key Types
//!
//! - [`EntryQuery`] / [`Edge`] / [`StatusFilter`] -- the query model
//! - [`Condition`] / [`FieldOp`] -- declarative filter trees
//! - [`EntryResolver`] -- snapshot-bound query execution
//! - [`LinkResolver`] / [`IndexLinkResolver`] -- async reference expansion

pub mod condition;
pub mod error;
pub mod links;
pub mod query;
pub mod resolver;

pub use condition::{Condition, FieldOp};
pub use error::{QueryError, QueryResult};
pub use links::{resolve_links, IndexLinkResolver, LinkResolver};
pub use query::{Direction, Edge, EntryQuery, OrderBy, StatusFilter};
pub use resolver::{project_entry, EntryResolver};
