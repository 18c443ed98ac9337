//! Error types for the schema crate.

/// Errors from schema lookups and configuration validation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaError {
    /// The named type is not part of the schema.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// The named field is not declared on the type.
    #[error("unknown field {field} on type {type_name}")]
    UnknownField { type_name: String, field: String },

    /// The named root is not configured for the workspace.
    #[error("unknown root: {0}")]
    UnknownRoot(String),

    /// A locale was used that the root does not enable.
    #[error("locale {locale:?} is not configured for root {root}")]
    InvalidLocale {
        root: String,
        locale: Option<String>,
    },

    /// The configuration itself is malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for schema results.
pub type SchemaResult<T> = Result<T, SchemaError>;
