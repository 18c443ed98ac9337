//! Typed shape metadata for Folio.
//!
//! The schema is authored elsewhere and consumed here as plain data: which
//! entry types exist, what fields they carry and of what shape, which types
//! may contain which children, and how workspaces, roots, locales, and
//! seeded entries are configured.
//!
//! # Key Types
//!
//! - [`Schema`] / [`TypeDef`] / [`FieldDef`] -- type and field definitions
//! - [`FieldShape`] -- closed shape enum (`Scalar | List | Reference | Record`)
//! - [`Contains`] -- container contract (which child types a type admits)
//! - [`WorkspaceConfig`] / [`RootConfig`] / [`SeedEntry`] -- tree layout

pub mod config;
pub mod error;
pub mod shape;
pub mod type_def;

pub use config::{RootConfig, SeedEntry, WorkspaceConfig};
pub use error::{SchemaError, SchemaResult};
pub use shape::FieldShape;
pub use type_def::{Contains, FieldDef, Schema, TypeDef, TypeKind};
