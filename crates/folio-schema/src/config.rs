use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{SchemaError, SchemaResult};

/// A default entry materialized on first sync when missing from the tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedEntry {
    /// Slash-separated slug path under the root (e.g. `"docs/intro"`).
    pub path: String,
    /// Schema type of the seeded entry.
    pub type_name: String,
    /// Initial field data; a missing `title` defaults to the last path
    /// segment.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl SeedEntry {
    pub fn new(path: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            type_name: type_name.into(),
            data: Map::new(),
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    /// The slug of the seeded entry itself (last path segment).
    pub fn slug(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// One root of the content tree.
///
/// A root is a top-level directory: entries under it form one hierarchy.
/// When locales are configured, each locale gets its own subtree directly
/// under the root directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootConfig {
    pub name: String,
    /// Enabled locales; empty means i18n is off for this root.
    #[serde(default)]
    pub locales: Vec<String>,
    /// Entries created automatically when missing.
    #[serde(default)]
    pub seeds: Vec<SeedEntry>,
}

impl RootConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locales: Vec::new(),
            seeds: Vec::new(),
        }
    }

    pub fn with_locales(mut self, locales: impl IntoIterator<Item = &'static str>) -> Self {
        self.locales = locales.into_iter().map(str::to_string).collect();
        self
    }

    pub fn with_seed(mut self, seed: SeedEntry) -> Self {
        self.seeds.push(seed);
        self
    }

    /// Whether this root splits its tree per locale.
    pub fn i18n_enabled(&self) -> bool {
        !self.locales.is_empty()
    }

    /// The locale new entries default to.
    pub fn default_locale(&self) -> Option<&str> {
        self.locales.first().map(String::as_str)
    }

    /// Check that `locale` is legal for this root: a configured locale when
    /// i18n is on, `None` when it is off.
    pub fn check_locale(&self, locale: Option<&str>) -> SchemaResult<()> {
        let ok = match locale {
            Some(l) => self.locales.iter().any(|c| c == l),
            None => !self.i18n_enabled(),
        };
        if ok {
            Ok(())
        } else {
            Err(SchemaError::InvalidLocale {
                root: self.name.clone(),
                locale: locale.map(str::to_string),
            })
        }
    }
}

/// The workspace an index is bound to: a named set of roots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub name: String,
    pub roots: BTreeMap<String, RootConfig>,
}

impl WorkspaceConfig {
    pub fn new(name: impl Into<String>, roots: impl IntoIterator<Item = RootConfig>) -> Self {
        Self {
            name: name.into(),
            roots: roots.into_iter().map(|r| (r.name.clone(), r)).collect(),
        }
    }

    pub fn root(&self, name: &str) -> Option<&RootConfig> {
        self.roots.get(name)
    }

    pub fn require_root(&self, name: &str) -> SchemaResult<&RootConfig> {
        self.root(name)
            .ok_or_else(|| SchemaError::UnknownRoot(name.to_string()))
    }
}
