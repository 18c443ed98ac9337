use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The shape of one field value.
///
/// Shapes form a closed tagged enum so that link resolution and validation
/// dispatch by pattern matching instead of probing runtime values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldShape {
    /// A plain value: string, number, or boolean.
    Scalar,
    /// An ordered list of values of one element shape.
    List(Box<FieldShape>),
    /// A reference to another entry, stored as the referenced entry's id
    /// (a single id string, or a list of ids when wrapped in [`Self::List`]).
    Reference,
    /// A nested object with per-key shapes.
    Record(BTreeMap<String, FieldShape>),
}

impl FieldShape {
    /// Returns `true` if any part of this shape can hold an entry reference.
    ///
    /// Used to skip link post-processing for fields that cannot possibly
    /// contain one.
    pub fn contains_references(&self) -> bool {
        match self {
            Self::Scalar => false,
            Self::Reference => true,
            Self::List(inner) => inner.contains_references(),
            Self::Record(fields) => fields.values().any(Self::contains_references),
        }
    }

    /// Convenience constructor for a list shape.
    pub fn list_of(inner: FieldShape) -> Self {
        Self::List(Box::new(inner))
    }

    /// Convenience constructor for a record shape.
    pub fn record(fields: impl IntoIterator<Item = (&'static str, FieldShape)>) -> Self {
        Self::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }
}
