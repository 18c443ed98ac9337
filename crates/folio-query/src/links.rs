//! Shape-driven reference resolution.
//!
//! After row selection, fields whose declared shape can hold entry
//! references are expanded: stored ids are replaced by the referenced
//! entries' projected data. Resolution follows the closed shape enum by
//! pattern matching and fans out concurrently; the whole fan-out is awaited
//! exhaustively, and dropping the future cancels it.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{try_join_all, BoxFuture};
use serde_json::Value;

use folio_index::EntryIndex;
use folio_schema::FieldShape;
use folio_types::EntryId;

use crate::error::QueryResult;
use crate::resolver::project_entry;

/// Resolves reference ids into projected entry data.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    /// Resolve one reference. `None` when the target does not exist.
    async fn resolve_one(&self, id: &EntryId) -> QueryResult<Option<Value>>;

    /// Resolve many references concurrently, dropping missing targets.
    async fn resolve_many(&self, ids: &[EntryId]) -> QueryResult<Vec<Value>> {
        let resolved = try_join_all(ids.iter().map(|id| self.resolve_one(id))).await?;
        Ok(resolved.into_iter().flatten().collect())
    }
}

/// A [`LinkResolver`] backed by an index snapshot: references resolve to
/// the target's canonical (main) variant with the default projection.
pub struct IndexLinkResolver {
    index: Arc<EntryIndex>,
}

impl IndexLinkResolver {
    pub fn new(index: Arc<EntryIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl LinkResolver for IndexLinkResolver {
    async fn resolve_one(&self, id: &EntryId) -> QueryResult<Option<Value>> {
        let Some(entry) = self.index.find_first(|e| e.id == *id && e.main) else {
            return Ok(None);
        };
        Ok(Some(project_entry(&entry, self.index.schema(), None)))
    }
}

/// Expand references inside one field value according to its shape.
///
/// Unresolvable values are left in place: a dangling reference becomes
/// `null`, a non-string where a reference was declared passes through
/// unchanged.
pub fn resolve_links<'a>(
    resolver: &'a dyn LinkResolver,
    shape: &'a FieldShape,
    value: Value,
) -> BoxFuture<'a, QueryResult<Value>> {
    Box::pin(async move {
        match (shape, value) {
            (FieldShape::Reference, Value::String(raw)) => {
                let id = EntryId::parse(&raw)?;
                Ok(resolver
                    .resolve_one(&id)
                    .await?
                    .unwrap_or(Value::Null))
            }
            (FieldShape::List(inner), Value::Array(items)) => {
                let resolved = try_join_all(
                    items
                        .into_iter()
                        .map(|item| resolve_links(resolver, inner, item)),
                )
                .await?;
                Ok(Value::Array(resolved))
            }
            (FieldShape::Record(fields), Value::Object(mut object)) => {
                let mut resolved_fields = Vec::new();
                for (name, inner) in fields {
                    if !inner.contains_references() {
                        continue;
                    }
                    if let Some(value) = object.remove(name.as_str()) {
                        resolved_fields
                            .push(async move { Ok::<_, crate::error::QueryError>((name, resolve_links(resolver, inner, value).await?)) });
                    }
                }
                for (name, value) in try_join_all(resolved_fields).await? {
                    object.insert(name.clone(), value);
                }
                Ok(Value::Object(object))
            }
            (_, value) => Ok(value),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    struct FakeResolver;

    #[async_trait]
    impl LinkResolver for FakeResolver {
        async fn resolve_one(&self, id: &EntryId) -> QueryResult<Option<Value>> {
            if id.as_str() == "missing" {
                return Ok(None);
            }
            Ok(Some(json!({ "id": id.as_str(), "title": "Resolved" })))
        }
    }

    #[tokio::test]
    async fn reference_resolves_to_projected_data() {
        let value = resolve_links(&FakeResolver, &FieldShape::Reference, json!("e1"))
            .await
            .unwrap();
        assert_eq!(value, json!({ "id": "e1", "title": "Resolved" }));
    }

    #[tokio::test]
    async fn dangling_reference_becomes_null() {
        let value = resolve_links(&FakeResolver, &FieldShape::Reference, json!("missing"))
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn list_of_references_resolves_each_element() {
        let shape = FieldShape::list_of(FieldShape::Reference);
        let value = resolve_links(&FakeResolver, &shape, json!(["a", "b"]))
            .await
            .unwrap();
        assert_eq!(
            value,
            json!([
                { "id": "a", "title": "Resolved" },
                { "id": "b", "title": "Resolved" },
            ])
        );
    }

    #[tokio::test]
    async fn record_resolves_only_reference_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("link".to_string(), FieldShape::Reference);
        fields.insert("label".to_string(), FieldShape::Scalar);
        let shape = FieldShape::Record(fields);

        let value = resolve_links(
            &FakeResolver,
            &shape,
            json!({ "link": "e1", "label": "stays" }),
        )
        .await
        .unwrap();
        assert_eq!(
            value,
            json!({ "link": { "id": "e1", "title": "Resolved" }, "label": "stays" })
        );
    }

    #[tokio::test]
    async fn scalar_passes_through() {
        let value = resolve_links(&FakeResolver, &FieldShape::Scalar, json!(42))
            .await
            .unwrap();
        assert_eq!(value, json!(42));
    }
}
