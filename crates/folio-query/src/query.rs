//! The declarative query model.

use serde::{Deserialize, Serialize};

use folio_types::EntryId;

use crate::condition::Condition;

/// Which phase variants a query sees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusFilter {
    /// Exactly the published variants.
    Published,
    /// Exactly the draft variants.
    Draft,
    /// Exactly the archived variants.
    Archived,
    /// Each id's editing-preferred variant (draft over published).
    PreferDraft,
    /// Each id's canonical public variant (published over archived).
    #[default]
    PreferPublished,
    /// No phase filtering.
    All,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// One ordering key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
    /// Fold string case before comparing.
    #[serde(default)]
    pub caseless: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
            caseless: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
            caseless: false,
        }
    }

    pub fn caseless(mut self) -> Self {
        self.caseless = true;
        self
    }
}

/// A graph traversal relative to an anchor entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "edge", rename_all = "camelCase")]
pub enum Edge {
    /// The anchor's parent. Single result.
    Parent { of: EntryId },
    /// Sibling with the nearest greater ordering key. Single result.
    Next { of: EntryId },
    /// Sibling with the nearest lesser ordering key. Single result.
    Previous { of: EntryId },
    /// Entries sharing the anchor's parent.
    Siblings {
        of: EntryId,
        #[serde(default)]
        include_self: bool,
    },
    /// Other-locale variants of the anchor's id. Bypasses the query's
    /// locale filter.
    Translations {
        of: EntryId,
        #[serde(default)]
        include_self: bool,
    },
    /// Descendants within the anchor's subtree, at most `depth` levels
    /// below it.
    Children { of: EntryId, depth: u32 },
    /// Ancestors of the anchor, nearest first, at most `depth` of them.
    Parents { of: EntryId, depth: u32 },
    /// The entry referenced by an id stored in one of the anchor's fields.
    /// Single result.
    EntrySingle { of: EntryId, field: String },
    /// The entries referenced by an id array stored in one of the anchor's
    /// fields.
    EntryMultiple { of: EntryId, field: String },
}

impl Edge {
    /// The anchor entry the edge originates from.
    pub fn anchor(&self) -> &EntryId {
        match self {
            Self::Parent { of }
            | Self::Next { of }
            | Self::Previous { of }
            | Self::Siblings { of, .. }
            | Self::Translations { of, .. }
            | Self::Children { of, .. }
            | Self::Parents { of, .. }
            | Self::EntrySingle { of, .. }
            | Self::EntryMultiple { of, .. } => of,
        }
    }

    /// Whether the edge yields at most one entry.
    pub fn is_single(&self) -> bool {
        matches!(
            self,
            Self::Parent { .. }
                | Self::Next { .. }
                | Self::Previous { .. }
                | Self::EntrySingle { .. }
        )
    }
}

/// A declarative query over the index snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryQuery {
    /// Restrict to these types; empty means any.
    #[serde(default)]
    pub types: Vec<String>,
    pub root: Option<String>,
    pub locale: Option<String>,
    #[serde(default)]
    pub status: StatusFilter,
    pub filter: Option<Condition>,
    /// Full-text search terms; results come back best match first.
    pub search: Option<String>,
    pub edge: Option<Edge>,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    /// Keep the first entry per distinct value of this field.
    pub group_by: Option<String>,
    pub skip: Option<usize>,
    pub take: Option<usize>,
    /// Projected fields; `None` projects the metadata set plus the type's
    /// declared fields.
    pub select: Option<Vec<String>>,
    /// Return only the first row.
    #[serde(default)]
    pub first: bool,
    /// Return the row count instead of rows.
    #[serde(default)]
    pub count: bool,
}

impl EntryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of_type(mut self, type_name: impl Into<String>) -> Self {
        self.types.push(type_name.into());
        self
    }

    pub fn in_root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn with_filter(mut self, filter: Condition) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_search(mut self, terms: impl Into<String>) -> Self {
        self.search = Some(terms.into());
        self
    }

    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edge = Some(edge);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by = Some(field.into());
        self
    }

    pub fn skip(mut self, n: usize) -> Self {
        self.skip = Some(n);
        self
    }

    pub fn take(mut self, n: usize) -> Self {
        self.take = Some(n);
        self
    }

    pub fn select(mut self, fields: impl IntoIterator<Item = &'static str>) -> Self {
        self.select = Some(fields.into_iter().map(str::to_string).collect());
        self
    }

    pub fn first(mut self) -> Self {
        self.first = true;
        self
    }

    pub fn count(mut self) -> Self {
        self.count = true;
        self
    }

    /// Whether the query yields a scalar rather than a row sequence.
    pub fn is_single(&self) -> bool {
        self.first
            || self.count
            || self.edge.as_ref().map(Edge::is_single).unwrap_or(false)
    }
}
