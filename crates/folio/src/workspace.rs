use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use folio_index::{Entry, EntryIndex, EventStream, IndexOptions, SyncReport};
use folio_query::{EntryQuery, EntryResolver, IndexLinkResolver};
use folio_schema::{Schema, WorkspaceConfig};
use folio_source::{InMemorySource, Source};
use folio_tx::{AllowAll, CommitRequest, EntryTransaction, Policy};
use folio_types::{EntryId, Sha};

use crate::error::FolioResult;

/// High-level handle over one content workspace.
///
/// Ties a [`Source`] tree, the [`EntryIndex`] built from it, the access
/// policy for transactions, and a query resolver together behind one API.
pub struct Folio {
    source: Arc<dyn Source>,
    index: Arc<EntryIndex>,
    policy: Arc<dyn Policy>,
    resolver: EntryResolver,
}

impl Folio {
    /// Open a workspace over an existing source and index its current tree.
    pub fn open(
        source: Arc<dyn Source>,
        schema: Arc<Schema>,
        config: Arc<WorkspaceConfig>,
    ) -> FolioResult<Self> {
        Self::open_with_options(source, schema, config, IndexOptions::default())
    }

    pub fn open_with_options(
        source: Arc<dyn Source>,
        schema: Arc<Schema>,
        config: Arc<WorkspaceConfig>,
        options: IndexOptions,
    ) -> FolioResult<Self> {
        let index = Arc::new(EntryIndex::with_options(schema, config, options));
        let report = index.sync_with(source.as_ref())?;
        debug!(sha = %report.sha.short_hex(), "opened workspace");
        let resolver = EntryResolver::new(Arc::clone(&index))
            .with_links(Arc::new(IndexLinkResolver::new(Arc::clone(&index))));
        Ok(Self {
            source,
            index,
            policy: Arc::new(AllowAll),
            resolver,
        })
    }

    /// Open a workspace over an empty in-memory source.
    pub fn in_memory(
        schema: Arc<Schema>,
        config: Arc<WorkspaceConfig>,
    ) -> FolioResult<Self> {
        Self::open(Arc::new(InMemorySource::new()), schema, config)
    }

    /// Replace the access policy applied to new transactions.
    pub fn with_policy(mut self, policy: Arc<dyn Policy>) -> Self {
        self.policy = policy;
        self
    }

    // ---- Tree state ----

    /// The sha of the tree the index currently reflects.
    pub fn sha(&self) -> Sha {
        self.index.sha()
    }

    /// Re-read the source tree and reindex whatever changed.
    pub fn sync(&self) -> FolioResult<SyncReport> {
        Ok(self.index.sync_with(self.source.as_ref())?)
    }

    /// Create any configured seed entries that are still missing.
    pub fn seed(&self) -> FolioResult<SyncReport> {
        Ok(self.index.seed(&self.source)?)
    }

    // ---- Mutation ----

    /// Start a transaction bound to the current snapshot.
    pub fn begin(&self) -> EntryTransaction<'_> {
        EntryTransaction::new(&self.index, self.policy.as_ref())
    }

    /// Apply a compiled commit request to the source and reindex.
    ///
    /// Fails with a check error when another writer changed any of the
    /// files the request touches; the caller retries on a fresh snapshot.
    pub fn commit(&self, request: &CommitRequest) -> FolioResult<SyncReport> {
        request.apply(self.source.as_ref())?;
        self.sync()
    }

    // ---- Reads ----

    /// The canonical variant of an entry, if it exists.
    pub fn entry(&self, id: &EntryId) -> Option<Arc<Entry>> {
        self.index.find_first(|e| e.id == *id && e.main)
    }

    /// Full-text search over the index, best matches first.
    pub fn search(&self, terms: &str) -> Vec<Arc<Entry>> {
        self.index.search(terms, None)
    }

    /// Execute a declarative query with link resolution.
    pub async fn resolve(&self, query: &EntryQuery) -> FolioResult<Value> {
        Ok(self.resolver.resolve(query).await?)
    }

    /// Execute a query with an in-flight preview entry substituted for its
    /// stored counterpart.
    pub async fn resolve_with_preview(
        &self,
        query: &EntryQuery,
        preview: &Arc<Entry>,
    ) -> FolioResult<Value> {
        Ok(self
            .resolver
            .resolve_with_preview(query, Some(preview))
            .await?)
    }

    /// Subscribe to index change events.
    pub fn subscribe(&self) -> EventStream {
        self.index.subscribe()
    }

    // ---- Accessors ----

    pub fn index(&self) -> &Arc<EntryIndex> {
        &self.index
    }

    pub fn source(&self) -> &Arc<dyn Source> {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_index::IndexEvent;
    use folio_query::{Condition, Edge, FieldOp, OrderBy, StatusFilter};
    use folio_schema::{Contains, FieldDef, FieldShape, RootConfig, SeedEntry, TypeDef};
    use folio_tx::{CreateEntry, MoveEntry, UpdateEntry};
    use folio_types::EntryPhase;
    use serde_json::{json, Map};

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::new([
            TypeDef::new("Page")
                .with_field("title", FieldDef::scalar().searchable())
                .with_field("body", FieldDef::scalar().searchable())
                .with_field("link", FieldDef::with_shape(FieldShape::Reference)),
            TypeDef::new("Author").with_contains(Contains::Nothing),
        ]))
    }

    fn config() -> Arc<WorkspaceConfig> {
        Arc::new(WorkspaceConfig::new("main", [RootConfig::new("pages")]))
    }

    fn workspace() -> Folio {
        Folio::in_memory(schema(), config()).unwrap()
    }

    fn create_published(folio: &Folio, title: &str) -> EntryId {
        let mut tx = folio.begin();
        let id = tx
            .create(CreateEntry::new("Page", "pages").with_title(title))
            .unwrap();
        folio.commit(&tx.into_request("create")).unwrap();
        id
    }

    #[test]
    fn open_empty_workspace() {
        let folio = workspace();
        assert!(folio.index().snapshot().is_empty());
    }

    #[test]
    fn seed_creates_configured_entries() {
        let config = Arc::new(WorkspaceConfig::new(
            "main",
            [RootConfig::new("pages").with_seed(SeedEntry::new("welcome", "Page"))],
        ));
        let folio = Folio::in_memory(schema(), config).unwrap();
        folio.seed().unwrap();

        let entry = folio.index().find_first(|e| e.path == "welcome").unwrap();
        assert_eq!(entry.phase, EntryPhase::Published);

        // Seeding again changes nothing.
        let sha = folio.sha();
        folio.seed().unwrap();
        assert_eq!(folio.sha(), sha);
    }

    #[test]
    fn draft_create_then_publish() {
        let folio = workspace();

        let mut tx = folio.begin();
        let id = tx
            .create(
                CreateEntry::new("Page", "pages")
                    .with_title("Getting Started")
                    .with_phase(EntryPhase::Draft),
            )
            .unwrap();
        folio.commit(&tx.into_request("draft")).unwrap();

        let draft = folio.entry(&id).unwrap();
        assert_eq!(draft.phase, EntryPhase::Draft);
        assert!(draft.active && draft.main);

        let mut tx = folio.begin();
        tx.publish(&id, None).unwrap();
        folio.commit(&tx.into_request("publish")).unwrap();

        let published = folio.entry(&id).unwrap();
        assert_eq!(published.phase, EntryPhase::Published);
        assert_eq!(published.url, "/getting-started");
        assert_eq!(folio.index().snapshot().len(), 1);
    }

    #[test]
    fn concurrent_edits_conflict() {
        let folio = workspace();
        let id = create_published(&folio, "Contested");

        // Two transactions bound to the same snapshot touch the same file.
        let mut tx1 = folio.begin();
        let mut patch = Map::new();
        patch.insert("body".to_string(), json!("first"));
        tx1.update(UpdateEntry::new(id.clone()).with_patch(patch))
            .unwrap();
        let request1 = tx1.into_request("first edit");

        let mut tx2 = folio.begin();
        let mut patch = Map::new();
        patch.insert("body".to_string(), json!("second"));
        tx2.update(UpdateEntry::new(id.clone()).with_patch(patch))
            .unwrap();
        let request2 = tx2.into_request("second edit");

        folio.commit(&request1).unwrap();
        let err = folio.commit(&request2).unwrap_err();
        assert!(err.is_conflict());

        // The losing edit retries against the fresh snapshot and lands.
        let mut retry = folio.begin();
        let mut patch = Map::new();
        patch.insert("body".to_string(), json!("second"));
        retry
            .update(UpdateEntry::new(id.clone()).with_patch(patch))
            .unwrap();
        folio.commit(&retry.into_request("second edit, retried")).unwrap();
        assert_eq!(folio.entry(&id).unwrap().data["body"], json!("second"));
    }

    #[test]
    fn slug_collisions_get_numbered() {
        let folio = workspace();
        create_published(&folio, "About");
        create_published(&folio, "About");
        create_published(&folio, "About");

        let paths: Vec<String> = folio
            .index()
            .snapshot()
            .iter()
            .map(|e| e.path.clone())
            .collect();
        assert!(paths.contains(&"about".to_string()));
        assert!(paths.contains(&"about-2".to_string()));
        assert!(paths.contains(&"about-3".to_string()));
    }

    #[test]
    fn move_reorders_siblings() {
        let folio = workspace();
        let a = create_published(&folio, "A");
        let _b = create_published(&folio, "B");
        let c = create_published(&folio, "C");

        let mut tx = folio.begin();
        tx.move_entry(MoveEntry::new(c).after(a)).unwrap();
        folio.commit(&tx.into_request("reorder")).unwrap();

        let order: Vec<String> = folio
            .index()
            .snapshot()
            .iter()
            .map(|e| e.path.clone())
            .collect();
        assert_eq!(order, vec!["a", "c", "b"]);
    }

    #[test]
    fn archive_cascades_to_descendants() {
        let folio = workspace();
        let parent = create_published(&folio, "Old Section");

        let mut tx = folio.begin();
        tx.create(
            CreateEntry::new("Page", "pages")
                .with_title("Child")
                .with_parent(parent.clone()),
        )
        .unwrap();
        folio.commit(&tx.into_request("child")).unwrap();

        let mut tx = folio.begin();
        tx.archive(&parent, None).unwrap();
        folio.commit(&tx.into_request("archive")).unwrap();

        let child = folio.index().find_first(|e| e.path == "child").unwrap();
        assert_eq!(child.phase, EntryPhase::Published);
        assert_eq!(child.status, EntryPhase::Archived);
    }

    #[test]
    fn remove_deletes_subtree() {
        let folio = workspace();
        let parent = create_published(&folio, "Section");
        let mut tx = folio.begin();
        tx.create(
            CreateEntry::new("Page", "pages")
                .with_title("Leaf")
                .with_parent(parent.clone()),
        )
        .unwrap();
        folio.commit(&tx.into_request("leaf")).unwrap();

        let mut tx = folio.begin();
        tx.remove(&parent).unwrap();
        folio.commit(&tx.into_request("remove")).unwrap();

        assert!(folio.index().snapshot().is_empty());
    }

    #[test]
    fn commit_emits_events() {
        let folio = workspace();
        let mut events = folio.subscribe();
        let id = create_published(&folio, "Watched");

        assert_eq!(events.try_recv().unwrap(), IndexEvent::Entry(id));
        assert_eq!(events.try_recv().unwrap(), IndexEvent::Index(folio.sha()));
    }

    #[test]
    fn search_finds_committed_content() {
        let folio = workspace();
        let mut tx = folio.begin();
        let mut data = Map::new();
        data.insert("body".to_string(), json!("fractional ordering keys"));
        tx.create(
            CreateEntry::new("Page", "pages")
                .with_title("Ordering")
                .with_data(data),
        )
        .unwrap();
        folio.commit(&tx.into_request("content")).unwrap();

        let hits = folio.search("fractional");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "ordering");
    }

    #[tokio::test]
    async fn query_resolves_links() {
        let folio = workspace();
        let target = create_published(&folio, "Target");

        let mut tx = folio.begin();
        let mut data = Map::new();
        data.insert("link".to_string(), json!(target.as_str()));
        tx.create(
            CreateEntry::new("Page", "pages")
                .with_title("Source Page")
                .with_data(data),
        )
        .unwrap();
        folio.commit(&tx.into_request("link")).unwrap();

        let query = EntryQuery::new()
            .with_filter(Condition::field(
                "path",
                FieldOp::Is(json!("source-page")),
            ))
            .first();
        let row = folio.resolve(&query).await.unwrap();
        assert_eq!(row["link"]["title"], json!("Target"));
    }

    proptest::proptest! {
        #[test]
        fn random_mutations_keep_snapshot_coherent(
            titles in proptest::collection::vec("[a-z]{3,8}", 1..6),
            moves in proptest::collection::vec((0usize..6, 0usize..6), 0..6),
        ) {
            let folio = workspace();
            let mut ids = Vec::new();
            for title in &titles {
                ids.push(create_published(&folio, title));
            }
            for (i, j) in moves {
                let (i, j) = (i % ids.len(), j % ids.len());
                if i == j {
                    continue;
                }
                let mut tx = folio.begin();
                tx.move_entry(MoveEntry::new(ids[i].clone()).after(ids[j].clone()))
                    .unwrap();
                folio.commit(&tx.into_request("move")).unwrap();
            }

            let snapshot = folio.index().snapshot();
            proptest::prop_assert_eq!(snapshot.len(), titles.len());
            for pair in snapshot.windows(2) {
                proptest::prop_assert!(
                    (&pair[0].index, &pair[0].file_path) < (&pair[1].index, &pair[1].file_path)
                );
            }
            let mut paths: Vec<&str> = snapshot.iter().map(|e| e.path.as_str()).collect();
            paths.sort();
            paths.dedup();
            proptest::prop_assert_eq!(paths.len(), snapshot.len());
            proptest::prop_assert!(snapshot.iter().all(|e| e.active && e.main));
        }
    }

    #[tokio::test]
    async fn query_edges_and_ordering() {
        let folio = workspace();
        let a = create_published(&folio, "Alpha");
        create_published(&folio, "Beta");
        create_published(&folio, "Gamma");

        let next = EntryQuery::new().with_edge(Edge::Next { of: a });
        let row = folio.resolve(&next).await.unwrap();
        assert_eq!(row["path"], json!("beta"));

        let reversed = EntryQuery::new()
            .with_status(StatusFilter::PreferPublished)
            .order_by(OrderBy::desc("title"));
        let rows = folio.resolve(&reversed).await.unwrap();
        let titles: Vec<&str> = rows
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Gamma", "Beta", "Alpha"]);
    }
}
