//! Error types for the foundation crate.

/// Errors from foundation type operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypeError {
    /// A hex string could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// A decoded value had the wrong byte length.
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// A fractional ordering key failed validation.
    #[error("invalid ordering key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// The bounds passed to key generation are not strictly ordered.
    #[error("ordering key bounds not increasing: {lower:?} >= {upper:?}")]
    KeyBoundsNotIncreasing { lower: String, upper: String },

    /// An entry file could not be decoded.
    #[error("invalid entry record: {0}")]
    InvalidRecord(String),

    /// An entry identifier failed validation.
    #[error("invalid entry id: {0}")]
    InvalidId(String),
}

/// Convenience alias for foundation results.
pub type TypeResult<T> = Result<T, TypeError>;
