//! Query execution against an index snapshot.
//!
//! Resolution is a pipeline over the flattened entry snapshot: scope
//! filters (root, type, locale, status), edge pre-filtering relative to an
//! anchor entry, the condition tree, ordering, grouping, paging, and
//! finally projection plus asynchronous link expansion. Reads never block
//! the index: the snapshot is captured once per call.

use std::cmp::Ordering;
use std::sync::Arc;

use futures::future::try_join_all;
use serde_json::{Map, Value};
use tracing::debug;

use folio_index::{Entry, EntryIndex, FilterOptions};
use folio_schema::Schema;
use folio_types::EntryId;

use crate::condition;
use crate::error::{QueryError, QueryResult};
use crate::links::{resolve_links, LinkResolver};
use crate::query::{Direction, Edge, EntryQuery, OrderBy, StatusFilter};

/// Metadata fields included in the default projection.
const META_FIELDS: [&str; 13] = [
    "id",
    "i18nId",
    "type",
    "path",
    "title",
    "url",
    "locale",
    "workspace",
    "root",
    "level",
    "index",
    "parent",
    "status",
];

/// Project one entry into a result row.
///
/// Without an explicit selection the row carries the metadata set plus the
/// type's declared fields; missing values read as `null`.
pub fn project_entry(entry: &Entry, schema: &Schema, select: Option<&[String]>) -> Value {
    let mut row = Map::new();
    match select {
        Some(fields) => {
            for field in fields {
                row.insert(
                    field.clone(),
                    entry.resolve_field(field).unwrap_or(Value::Null),
                );
            }
        }
        None => {
            for field in META_FIELDS {
                row.insert(
                    field.to_string(),
                    entry.resolve_field(field).unwrap_or(Value::Null),
                );
            }
            if let Some(type_def) = schema.get(&entry.type_name) {
                for field in type_def.fields.keys() {
                    row.insert(
                        field.clone(),
                        entry.resolve_field(field).unwrap_or(Value::Null),
                    );
                }
            }
        }
    }
    Value::Object(row)
}

/// Executes declarative queries against an [`EntryIndex`].
pub struct EntryResolver {
    index: Arc<EntryIndex>,
    links: Option<Arc<dyn LinkResolver>>,
}

impl EntryResolver {
    pub fn new(index: Arc<EntryIndex>) -> Self {
        Self { index, links: None }
    }

    /// Enable reference expansion through a [`LinkResolver`].
    pub fn with_links(mut self, links: Arc<dyn LinkResolver>) -> Self {
        self.links = Some(links);
        self
    }

    pub fn index(&self) -> &Arc<EntryIndex> {
        &self.index
    }

    /// Execute a query. Sequence queries return an array of rows; `first`,
    /// `count`, and single-result edges return a scalar (or `null`).
    pub async fn resolve(&self, query: &EntryQuery) -> QueryResult<Value> {
        self.resolve_with_preview(query, None).await
    }

    /// Execute a query with one in-flight preview entry shadowing its
    /// stored counterpart.
    pub async fn resolve_with_preview(
        &self,
        query: &EntryQuery,
        preview: Option<&Arc<Entry>>,
    ) -> QueryResult<Value> {
        let mut rows = self.index.filter(
            FilterOptions {
                search: query.search.as_deref(),
                ..FilterOptions::default()
            },
            preview,
        );

        // Translations deliberately cross the locale boundary.
        let skip_locale_filter = matches!(query.edge, Some(Edge::Translations { .. }));
        rows.retain(|e| {
            query.root.as_ref().map_or(true, |root| e.root == *root)
                && (query.types.is_empty() || query.types.iter().any(|t| *t == e.type_name))
                && (skip_locale_filter
                    || query.locale.as_ref().map_or(true, |l| {
                        e.locale.as_deref() == Some(l.as_str())
                    }))
                && phase_selected(e, query.status)
        });

        if let Some(edge) = &query.edge {
            rows = self.apply_edge(edge, &query.locale, rows)?;
        }

        if let Some(filter) = &query.filter {
            rows.retain(|e| filter.matches_entry(e));
        }

        if !query.order_by.is_empty() {
            order_entries(&mut rows, &query.order_by);
        }

        if let Some(group_field) = &query.group_by {
            let mut seen: Vec<Value> = Vec::new();
            rows.retain(|e| {
                let key = e.resolve_field(group_field).unwrap_or(Value::Null);
                if seen.contains(&key) {
                    false
                } else {
                    seen.push(key);
                    true
                }
            });
        }

        if let Some(skip) = query.skip {
            rows.drain(..skip.min(rows.len()));
        }
        if let Some(take) = query.take {
            rows.truncate(take);
        }

        debug!(rows = rows.len(), single = query.is_single(), "resolved query");

        if query.count {
            return Ok(Value::from(rows.len() as u64));
        }

        let schema = Arc::clone(self.index.schema());
        let mut projected: Vec<Value> = rows
            .iter()
            .map(|e| project_entry(e, &schema, query.select.as_deref()))
            .collect();
        self.apply_links(&mut projected, &rows, &schema).await?;

        if query.is_single() {
            return Ok(projected.into_iter().next().unwrap_or(Value::Null));
        }
        Ok(Value::Array(projected))
    }

    /// The entry an edge originates from: the active variant of the id,
    /// narrowed by the query locale when one is set.
    fn anchor(&self, id: &EntryId, locale: &Option<String>) -> QueryResult<Arc<Entry>> {
        self.index
            .snapshot()
            .iter()
            .filter(|e| e.id == *id && (locale.is_none() || e.locale == *locale))
            .find(|e| e.active)
            .cloned()
            .ok_or_else(|| QueryError::AnchorNotFound(id.clone()))
    }

    fn apply_edge(
        &self,
        edge: &Edge,
        locale: &Option<String>,
        rows: Vec<Arc<Entry>>,
    ) -> QueryResult<Vec<Arc<Entry>>> {
        let anchor = self.anchor(edge.anchor(), locale)?;
        let out = match edge {
            Edge::Parent { .. } => match &anchor.parent_id {
                Some(pid) => rows
                    .into_iter()
                    .filter(|e| e.id == *pid && e.locale == anchor.locale)
                    .collect(),
                None => Vec::new(),
            },
            Edge::Next { .. } => nearest_sibling(rows, &anchor, Ordering::Greater),
            Edge::Previous { .. } => nearest_sibling(rows, &anchor, Ordering::Less),
            Edge::Siblings { include_self, .. } => rows
                .into_iter()
                .filter(|e| {
                    e.parent_dir == anchor.parent_dir
                        && e.locale == anchor.locale
                        && (*include_self || e.id != anchor.id)
                })
                .collect(),
            Edge::Translations { include_self, .. } => rows
                .into_iter()
                .filter(|e| e.id == anchor.id && (*include_self || e.locale != anchor.locale))
                .collect(),
            Edge::Children { depth, .. } => {
                let prefix = format!("{}/", anchor.children_dir);
                rows.into_iter()
                    .filter(|e| {
                        e.file_path.starts_with(&prefix)
                            && (*depth == 0 || e.level <= anchor.level + depth)
                    })
                    .collect()
            }
            Edge::Parents { depth, .. } => {
                // Ancestor directories, nearest first.
                let mut chain: Vec<&str> = Vec::new();
                let base_segments = 1 + usize::from(anchor.locale.is_some());
                let mut dir = anchor.parent_dir.as_str();
                while dir.split('/').count() > base_segments {
                    chain.push(dir);
                    match dir.rsplit_once('/') {
                        Some((up, _)) => dir = up,
                        None => break,
                    }
                }
                if *depth > 0 {
                    chain.truncate(*depth as usize);
                }
                chain
                    .iter()
                    .flat_map(|dir| {
                        rows.iter()
                            .filter(|e| e.children_dir == *dir && e.locale == anchor.locale)
                            .cloned()
                            .collect::<Vec<_>>()
                    })
                    .collect()
            }
            Edge::EntrySingle { field, .. } => {
                let ids = reference_ids(&anchor, field, false)?;
                retain_by_ids(rows, &ids)
            }
            Edge::EntryMultiple { field, .. } => {
                let ids = reference_ids(&anchor, field, true)?;
                retain_by_ids(rows, &ids)
            }
        };
        Ok(out)
    }

    async fn apply_links(
        &self,
        rows: &mut [Value],
        entries: &[Arc<Entry>],
        schema: &Schema,
    ) -> QueryResult<()> {
        let Some(links) = &self.links else {
            return Ok(());
        };
        for (row, entry) in rows.iter_mut().zip(entries) {
            let Value::Object(object) = row else {
                continue;
            };
            let Some(type_def) = schema.get(&entry.type_name) else {
                continue;
            };
            let mut pending = Vec::new();
            for (field, shape) in type_def.reference_fields() {
                if let Some(value) = object.remove(field) {
                    pending.push(async move {
                        Ok::<_, QueryError>((
                            field,
                            resolve_links(links.as_ref(), shape, value).await?,
                        ))
                    });
                }
            }
            for (field, value) in try_join_all(pending).await? {
                object.insert(field.to_string(), value);
            }
        }
        Ok(())
    }
}

fn phase_selected(entry: &Entry, status: StatusFilter) -> bool {
    use folio_types::EntryPhase;
    match status {
        StatusFilter::Published => entry.phase == EntryPhase::Published,
        StatusFilter::Draft => entry.phase == EntryPhase::Draft,
        StatusFilter::Archived => entry.phase == EntryPhase::Archived,
        StatusFilter::PreferDraft => entry.active,
        StatusFilter::PreferPublished => entry.main,
        StatusFilter::All => true,
    }
}

/// The sibling with the nearest index on the given side of the anchor.
fn nearest_sibling(
    rows: Vec<Arc<Entry>>,
    anchor: &Entry,
    side: Ordering,
) -> Vec<Arc<Entry>> {
    let mut candidates: Vec<Arc<Entry>> = rows
        .into_iter()
        .filter(|e| {
            e.parent_dir == anchor.parent_dir
                && e.locale == anchor.locale
                && e.id != anchor.id
                && e.index.cmp(&anchor.index) == side
        })
        .collect();
    candidates.sort_by(|a, b| {
        a.index
            .cmp(&b.index)
            .then_with(|| a.file_path.cmp(&b.file_path))
    });
    match side {
        Ordering::Greater => candidates.truncate(1),
        _ => {
            candidates.reverse();
            candidates.truncate(1);
        }
    }
    candidates
}

/// Stored reference id(s) in one of the anchor's fields.
fn reference_ids(anchor: &Entry, field: &str, multiple: bool) -> QueryResult<Vec<EntryId>> {
    let invalid = |reason: &str| QueryError::InvalidReference {
        field: field.to_string(),
        reason: reason.to_string(),
    };
    match anchor.data.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(id)) if !multiple => Ok(vec![EntryId::parse(id.as_str())?]),
        Some(Value::Array(items)) if multiple => items
            .iter()
            .map(|item| match item {
                Value::String(id) => Ok(EntryId::parse(id.as_str())?),
                _ => Err(invalid("array element is not an id string")),
            })
            .collect(),
        Some(_) => Err(invalid(if multiple {
            "expected an array of id strings"
        } else {
            "expected an id string"
        })),
    }
}

/// Keep rows whose id appears in `ids`, in the order the ids were stored.
fn retain_by_ids(rows: Vec<Arc<Entry>>, ids: &[EntryId]) -> Vec<Arc<Entry>> {
    ids.iter()
        .flat_map(|id| {
            rows.iter()
                .filter(|e| e.id == *id)
                .cloned()
                .collect::<Vec<_>>()
        })
        .collect()
}

fn order_entries(rows: &mut [Arc<Entry>], keys: &[OrderBy]) {
    rows.sort_by(|a, b| {
        for key in keys {
            let av = order_value(a, key);
            let bv = order_value(b, key);
            let mut ord = condition::compare(&av, &bv)
                .unwrap_or_else(|| type_rank(&av).cmp(&type_rank(&bv)));
            if key.direction == Direction::Desc {
                ord = ord.reverse();
            }
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn order_value(entry: &Entry, key: &OrderBy) -> Value {
    let value = entry.resolve_field(&key.field).unwrap_or(Value::Null);
    if key.caseless {
        if let Value::String(s) = &value {
            return Value::String(s.to_lowercase());
        }
    }
    value
}

/// Fallback rank for ordering values of mismatched runtime types.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) | Value::Object(_) => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_schema::{
        Contains, FieldDef, FieldShape, RootConfig, TypeDef, WorkspaceConfig,
    };
    use folio_source::InMemorySource;
    use folio_types::{EntryMeta, EntryRecord, FracKey};
    use serde_json::json;

    use crate::condition::{Condition, FieldOp};
    use crate::links::IndexLinkResolver;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::new([
            TypeDef::new("Doc")
                .with_field("title", FieldDef::scalar().searchable())
                .with_field("category", FieldDef::scalar())
                .with_field("weight", FieldDef::scalar())
                .with_field("link", FieldDef::with_shape(FieldShape::Reference)),
            TypeDef::new("Page").with_contains(Contains::Any),
        ]))
    }

    fn config() -> Arc<WorkspaceConfig> {
        Arc::new(WorkspaceConfig::new(
            "main",
            [
                RootConfig::new("pages"),
                RootConfig::new("i18n").with_locales(["en", "fr"]),
            ],
        ))
    }

    fn record(id: &str, type_name: &str, title: &str, key: &str) -> Vec<u8> {
        record_with(id, type_name, title, key, Map::new())
    }

    fn record_with(
        id: &str,
        type_name: &str,
        title: &str,
        key: &str,
        mut data: Map<String, Value>,
    ) -> Vec<u8> {
        data.insert("title".to_string(), Value::String(title.to_string()));
        EntryRecord::new(
            EntryMeta {
                id: EntryId::parse(id).unwrap(),
                type_name: type_name.to_string(),
                index: FracKey::parse(key).unwrap(),
                seeded: None,
            },
            data,
        )
        .encode()
    }

    fn resolver(files: &[(&str, Vec<u8>)]) -> EntryResolver {
        let source =
            InMemorySource::with_files(files.iter().map(|(p, c)| (*p, c.clone()))).unwrap();
        let index = Arc::new(EntryIndex::new(schema(), config()));
        index.sync_with(&source).unwrap();
        EntryResolver::new(index)
    }

    fn field_values(result: &Value, field: &str) -> Vec<Value> {
        result
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row[field].clone())
            .collect()
    }

    #[tokio::test]
    async fn filter_order_and_take() {
        let resolver = resolver(&[
            ("pages/intro-b.json", record("b", "Doc", "Intro B", "n")),
            ("pages/other.json", record("o", "Doc", "Other", "g")),
            ("pages/intro-a.json", record("a", "Doc", "Intro A", "t")),
        ]);
        let query = EntryQuery::new()
            .of_type("Doc")
            .with_filter(Condition::field(
                "title",
                FieldOp::StartsWith("Intro".to_string()),
            ))
            .order_by(OrderBy::asc("path"))
            .take(5);
        let result = resolver.resolve(&query).await.unwrap();
        assert_eq!(
            field_values(&result, "path"),
            vec![json!("intro-a"), json!("intro-b")]
        );
    }

    #[tokio::test]
    async fn status_selectors() {
        let resolver = resolver(&[
            ("pages/a.json", record("a", "Doc", "Live", "n")),
            ("pages/a.draft.json", record("a", "Doc", "Draft", "n")),
        ]);

        let prefer_draft = EntryQuery::new().with_status(StatusFilter::PreferDraft);
        let result = resolver.resolve(&prefer_draft).await.unwrap();
        assert_eq!(field_values(&result, "title"), vec![json!("Draft")]);

        let prefer_published = EntryQuery::new().with_status(StatusFilter::PreferPublished);
        let result = resolver.resolve(&prefer_published).await.unwrap();
        assert_eq!(field_values(&result, "title"), vec![json!("Live")]);

        let all = EntryQuery::new().with_status(StatusFilter::All);
        let result = resolver.resolve(&all).await.unwrap();
        assert_eq!(result.as_array().unwrap().len(), 2);

        let archived = EntryQuery::new().with_status(StatusFilter::Archived);
        let result = resolver.resolve(&archived).await.unwrap();
        assert!(result.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn parent_next_previous_and_siblings() {
        let resolver = resolver(&[
            ("pages/docs.json", record("d", "Page", "Docs", "n")),
            ("pages/docs/a.json", record("a", "Doc", "A", "f")),
            ("pages/docs/b.json", record("b", "Doc", "B", "n")),
            ("pages/docs/c.json", record("c", "Doc", "C", "t")),
        ]);
        let id = |s: &str| EntryId::parse(s).unwrap();

        let parent = EntryQuery::new().with_edge(Edge::Parent { of: id("b") });
        let result = resolver.resolve(&parent).await.unwrap();
        assert_eq!(result["id"], json!("d"));

        let next = EntryQuery::new().with_edge(Edge::Next { of: id("b") });
        let result = resolver.resolve(&next).await.unwrap();
        assert_eq!(result["id"], json!("c"));

        let previous = EntryQuery::new().with_edge(Edge::Previous { of: id("b") });
        let result = resolver.resolve(&previous).await.unwrap();
        assert_eq!(result["id"], json!("a"));

        // No sibling beyond the last one.
        let past_end = EntryQuery::new().with_edge(Edge::Next { of: id("c") });
        assert_eq!(resolver.resolve(&past_end).await.unwrap(), Value::Null);

        let siblings = EntryQuery::new().with_edge(Edge::Siblings {
            of: id("b"),
            include_self: false,
        });
        let result = resolver.resolve(&siblings).await.unwrap();
        assert_eq!(field_values(&result, "id"), vec![json!("a"), json!("c")]);
    }

    #[tokio::test]
    async fn translations_bypass_locale_filter() {
        let resolver = resolver(&[
            ("i18n/en/home.json", record("h", "Doc", "Home", "n")),
            ("i18n/fr/accueil.json", record("h", "Doc", "Accueil", "n")),
        ]);
        let query = EntryQuery::new()
            .with_locale("en")
            .with_edge(Edge::Translations {
                of: EntryId::parse("h").unwrap(),
                include_self: false,
            });
        let result = resolver.resolve(&query).await.unwrap();
        assert_eq!(field_values(&result, "locale"), vec![json!("fr")]);
    }

    #[tokio::test]
    async fn children_respect_depth() {
        let resolver = resolver(&[
            ("pages/docs.json", record("d", "Page", "Docs", "n")),
            ("pages/docs/guide.json", record("g", "Page", "Guide", "n")),
            ("pages/docs/guide/deep.json", record("x", "Doc", "Deep", "n")),
        ]);
        let id = EntryId::parse("d").unwrap();

        let one = EntryQuery::new().with_edge(Edge::Children {
            of: id.clone(),
            depth: 1,
        });
        let result = resolver.resolve(&one).await.unwrap();
        assert_eq!(field_values(&result, "id"), vec![json!("g")]);

        let unbounded = EntryQuery::new().with_edge(Edge::Children { of: id, depth: 0 });
        let result = resolver.resolve(&unbounded).await.unwrap();
        assert_eq!(result.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn parents_are_nearest_first() {
        let resolver = resolver(&[
            ("pages/docs.json", record("d", "Page", "Docs", "n")),
            ("pages/docs/guide.json", record("g", "Page", "Guide", "n")),
            ("pages/docs/guide/deep.json", record("x", "Doc", "Deep", "n")),
        ]);
        let query = EntryQuery::new().with_edge(Edge::Parents {
            of: EntryId::parse("x").unwrap(),
            depth: 0,
        });
        let result = resolver.resolve(&query).await.unwrap();
        assert_eq!(field_values(&result, "id"), vec![json!("g"), json!("d")]);
    }

    #[tokio::test]
    async fn entry_single_edge_follows_stored_reference() {
        let mut data = Map::new();
        data.insert("link".to_string(), json!("t"));
        let resolver = resolver(&[
            ("pages/from.json", record_with("f", "Doc", "From", "g", data)),
            ("pages/target.json", record("t", "Doc", "Target", "n")),
        ]);
        let query = EntryQuery::new().with_edge(Edge::EntrySingle {
            of: EntryId::parse("f").unwrap(),
            field: "link".to_string(),
        });
        let result = resolver.resolve(&query).await.unwrap();
        assert_eq!(result["title"], json!("Target"));
    }

    #[tokio::test]
    async fn group_by_keeps_first_per_key() {
        let mk = |cat: &str| {
            let mut data = Map::new();
            data.insert("category".to_string(), json!(cat));
            data
        };
        let resolver = resolver(&[
            ("pages/a.json", record_with("a", "Doc", "A", "f", mk("x"))),
            ("pages/b.json", record_with("b", "Doc", "B", "n", mk("x"))),
            ("pages/c.json", record_with("c", "Doc", "C", "t", mk("y"))),
        ]);
        let query = EntryQuery::new().group_by("category");
        let result = resolver.resolve(&query).await.unwrap();
        assert_eq!(field_values(&result, "id"), vec![json!("a"), json!("c")]);
    }

    #[tokio::test]
    async fn numeric_ordering_is_numeric() {
        let mk = |weight: i64| {
            let mut data = Map::new();
            data.insert("weight".to_string(), json!(weight));
            data
        };
        let resolver = resolver(&[
            ("pages/a.json", record_with("a", "Doc", "A", "f", mk(2))),
            ("pages/b.json", record_with("b", "Doc", "B", "n", mk(10))),
            ("pages/c.json", record_with("c", "Doc", "C", "t", mk(1))),
        ]);
        let query = EntryQuery::new().order_by(OrderBy::asc("weight"));
        let result = resolver.resolve(&query).await.unwrap();
        assert_eq!(
            field_values(&result, "weight"),
            vec![json!(1), json!(2), json!(10)]
        );

        let query = EntryQuery::new().order_by(OrderBy::desc("weight"));
        let result = resolver.resolve(&query).await.unwrap();
        assert_eq!(
            field_values(&result, "weight"),
            vec![json!(10), json!(2), json!(1)]
        );
    }

    #[tokio::test]
    async fn count_and_first_are_scalars() {
        let resolver = resolver(&[
            ("pages/a.json", record("a", "Doc", "A", "g")),
            ("pages/b.json", record("b", "Doc", "B", "n")),
        ]);
        let count = EntryQuery::new().of_type("Doc").count();
        assert_eq!(resolver.resolve(&count).await.unwrap(), json!(2));

        let first = EntryQuery::new().of_type("Doc").first();
        let result = resolver.resolve(&first).await.unwrap();
        assert_eq!(result["id"], json!("a"));
    }

    #[tokio::test]
    async fn select_overrides_default_projection() {
        let resolver = resolver(&[("pages/a.json", record("a", "Doc", "A", "n"))]);

        let query = EntryQuery::new().select(["path", "title"]);
        let result = resolver.resolve(&query).await.unwrap();
        let row = result.as_array().unwrap()[0].as_object().unwrap();
        assert_eq!(row.len(), 2);
        assert_eq!(row["path"], json!("a"));

        // The default projection carries metadata plus declared fields.
        let result = resolver.resolve(&EntryQuery::new()).await.unwrap();
        let row = result.as_array().unwrap()[0].as_object().unwrap();
        assert_eq!(row["url"], json!("/a"));
        assert!(row.contains_key("category"));
    }

    #[tokio::test]
    async fn links_expand_referenced_entries() {
        let mut data = Map::new();
        data.insert("link".to_string(), json!("t"));
        let files = [
            (
                "pages/from.json",
                record_with("f", "Doc", "From", "g", data),
            ),
            ("pages/target.json", record("t", "Doc", "Target", "n")),
        ];
        let source =
            InMemorySource::with_files(files.iter().map(|(p, c)| (*p, c.clone()))).unwrap();
        let index = Arc::new(EntryIndex::new(schema(), config()));
        index.sync_with(&source).unwrap();
        let resolver = EntryResolver::new(Arc::clone(&index))
            .with_links(Arc::new(IndexLinkResolver::new(index)));

        let query = EntryQuery::new().with_filter(Condition::field(
            "id",
            FieldOp::Is(json!("f")),
        ));
        let result = resolver.resolve(&query).await.unwrap();
        let row = &result.as_array().unwrap()[0];
        assert_eq!(row["link"]["title"], json!("Target"));
    }

    #[tokio::test]
    async fn preview_substitutes_without_mutating_snapshot() {
        let resolver = resolver(&[("pages/a.json", record("a", "Doc", "Stored", "n"))]);
        let stored = resolver.index().find_first(|_| true).unwrap();
        let mut preview = (*stored).clone();
        preview.title = "Edited".to_string();
        preview
            .data
            .insert("title".to_string(), json!("Edited"));
        let preview = Arc::new(preview);

        let query = EntryQuery::new().first();
        let result = resolver
            .resolve_with_preview(&query, Some(&preview))
            .await
            .unwrap();
        assert_eq!(result["title"], json!("Edited"));

        let result = resolver.resolve(&query).await.unwrap();
        assert_eq!(result["title"], json!("Stored"));
    }

    #[tokio::test]
    async fn draft_only_child_statuses() {
        let resolver = resolver(&[
            ("pages/parent.json", record("p", "Page", "Parent", "n")),
            ("pages/parent/a.draft.json", record("a", "Doc", "Only draft", "n")),
        ]);
        // A lone draft is both the editing-preferred and the canonical
        // variant of its id.
        for status in [StatusFilter::PreferDraft, StatusFilter::PreferPublished] {
            let query = EntryQuery::new().of_type("Doc").with_status(status);
            let result = resolver.resolve(&query).await.unwrap();
            assert_eq!(field_values(&result, "title"), vec![json!("Only draft")]);
        }
        let published = EntryQuery::new()
            .of_type("Doc")
            .with_status(StatusFilter::Published);
        let result = resolver.resolve(&published).await.unwrap();
        assert!(result.as_array().unwrap().is_empty());
    }
}
