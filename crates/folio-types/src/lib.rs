//! Foundation types for Folio.
//!
//! This crate provides the identifiers, hashing, ordering, and codec
//! primitives used throughout the Folio system. Every other Folio crate
//! depends on `folio-types`.
//!
//! # Key Types
//!
//! - [`Sha`] -- Content-addressed identifier (domain-separated BLAKE3 hash)
//! - [`EntryId`] -- Stable entry identifier (UUID v7 backed)
//! - [`EntryPhase`] -- Revision phase: draft, published, or archived
//! - [`FracKey`] -- Fractional ordering key for sibling placement
//! - [`EntryRecord`] -- Parsed entry file: meta header plus field data

pub mod error;
pub mod fracindex;
pub mod hasher;
pub mod id;
pub mod phase;
pub mod record;
pub mod sha;
pub mod text;

pub use error::{TypeError, TypeResult};
pub use fracindex::FracKey;
pub use hasher::ContentHasher;
pub use id::EntryId;
pub use phase::EntryPhase;
pub use record::{EntryMeta, EntryRecord};
pub use sha::Sha;
pub use text::{fold_diacritics, slugify, tokenize};
