//! Entry transactions for Folio.
//!
//! Mutations against the content tree are built as snapshot-bound
//! transactions: each operation validates against one index snapshot,
//! checks the access [`Policy`], and stages file-level changes. The batch
//! compiles into a [`CommitRequest`] carrying per-file base-state checks,
//! so the applying side detects concurrent modification of exactly the
//! files the transaction touches.
//!
//! # Key Types
//!
//! - [`EntryTransaction`] -- create / update / publish / archive / move /
//!   remove / upload-file / remove-file
//! - [`CommitRequest`] / [`CommitChange`] -- the compiled, verifiable batch
//! - [`Policy`] / [`Permission`] -- the access-control seam
//! - [`TxError`] -- conflicts, integrity violations, permission denials

pub mod error;
pub mod policy;
pub mod request;
pub mod transaction;

pub use error::{TxError, TxResult};
pub use policy::{AllowAll, Deny, Permission, Policy};
pub use request::{CommitChange, CommitRequest};
pub use transaction::{CreateEntry, EntryTransaction, InsertOrder, MoveEntry, UpdateEntry};
