use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};
use crate::shape::FieldShape;

/// What kind of content a type models.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// Ordinary content document.
    Document,
    /// Folder of binary media assets.
    MediaLibrary,
    /// One binary media asset; its field data points at the stored file.
    MediaFile,
}

/// Container contract: which child types a type admits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Contains {
    /// The type is a leaf; children are rejected.
    Nothing,
    /// Any type may nest under this one.
    Any,
    /// Only the listed types may nest under this one.
    Only(Vec<String>),
}

/// One declared field on a type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub shape: FieldShape,
    /// Whether the field's text participates in full-text search.
    #[serde(default)]
    pub searchable: bool,
    /// Whether the field's value is kept in sync across locale variants.
    #[serde(default)]
    pub shared: bool,
}

impl FieldDef {
    pub fn scalar() -> Self {
        Self {
            shape: FieldShape::Scalar,
            searchable: false,
            shared: false,
        }
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    pub fn shared(mut self) -> Self {
        self.shared = true;
        self
    }

    pub fn with_shape(shape: FieldShape) -> Self {
        Self {
            shape,
            searchable: false,
            shared: false,
        }
    }
}

/// One entry type: its fields and its container contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,
    pub fields: BTreeMap<String, FieldDef>,
    pub contains: Contains,
}

impl TypeDef {
    /// Create a document type with no fields, admitting any children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Document,
            fields: BTreeMap::new(),
            contains: Contains::Any,
        }
    }

    pub fn with_kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    pub fn with_contains(mut self, contains: Contains) -> Self {
        self.contains = contains;
        self
    }

    /// Whether an entry of `child_type` may nest under this type.
    pub fn admits_child(&self, child_type: &str) -> bool {
        match &self.contains {
            Contains::Nothing => false,
            Contains::Any => true,
            Contains::Only(types) => types.iter().any(|t| t == child_type),
        }
    }

    /// Names of fields participating in full-text search.
    pub fn searchable_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, def)| def.searchable)
            .map(|(name, _)| name.as_str())
    }

    /// Names of fields kept in sync across locale variants.
    pub fn shared_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, def)| def.shared)
            .map(|(name, _)| name.as_str())
    }

    /// Fields whose shape can hold entry references.
    pub fn reference_fields(&self) -> impl Iterator<Item = (&str, &FieldShape)> {
        self.fields
            .iter()
            .filter(|(_, def)| def.shape.contains_references())
            .map(|(name, def)| (name.as_str(), &def.shape))
    }
}

/// The full set of entry types known to an index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    types: BTreeMap<String, TypeDef>,
}

impl Schema {
    /// Build a schema from type definitions.
    pub fn new(types: impl IntoIterator<Item = TypeDef>) -> Self {
        Self {
            types: types.into_iter().map(|t| (t.name.clone(), t)).collect(),
        }
    }

    /// Look up a type, or `None` if it is not declared.
    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Look up a type, erroring if it is not declared.
    pub fn require(&self, name: &str) -> SchemaResult<&TypeDef> {
        self.get(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    /// All declared type names.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}
