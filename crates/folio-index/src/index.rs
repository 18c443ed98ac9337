//! The entry index: the authoritative in-memory view of the content tree.
//!
//! The index consumes file-level changes (from a tree diff or directly from
//! a transaction), aggregates files into [`EntryNode`]s, recomputes derived
//! state (parent links, effective status, active/main flags, urls), and
//! publishes an immutable, sorted snapshot of all entries. The snapshot
//! vector is replaced wholesale on every reindex, never mutated in place, so
//! readers holding the previous `Arc` keep a coherent view.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use folio_schema::{Schema, SeedEntry, WorkspaceConfig};
use folio_source::{diff_trees, Change, Source, SourceTransaction, Tree};
use folio_types::{EntryId, EntryPhase, EntryRecord, FracKey, Sha};

use crate::entry::Entry;
use crate::error::{IndexError, IndexResult, IntegrityError};
use crate::events::{channel, EventStream, IndexEvent};
use crate::node::{check_child_allowed, EntryNode};
use crate::search::SearchIndex;

/// What to do with a file that cannot be parsed as an entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InvalidEntryPolicy {
    /// Record the file in the sync report, log a warning, and continue.
    /// One bad file never corrupts the rest of the index.
    #[default]
    Skip,
    /// Fail the whole sync. For deployments that treat any malformed
    /// content as corruption.
    Fail,
}

/// Index construction options.
#[derive(Clone, Debug)]
pub struct IndexOptions {
    pub invalid_entry: InvalidEntryPolicy,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            invalid_entry: InvalidEntryPolicy::Skip,
            event_capacity: 256,
        }
    }
}

/// One file skipped during a sync.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Outcome of one sync: the tree sha the index now reflects plus any
/// skipped files.
#[derive(Clone, Debug)]
pub struct SyncReport {
    pub sha: Sha,
    pub skipped: Vec<SkippedFile>,
}

/// Filtering options for [`EntryIndex::filter`].
#[derive(Default)]
pub struct FilterOptions<'a> {
    /// Restrict to these ids.
    pub ids: Option<&'a [EntryId]>,
    /// Full-text search terms.
    pub search: Option<&'a str>,
    /// Arbitrary predicate over candidate entries.
    #[allow(clippy::type_complexity)]
    pub condition: Option<&'a (dyn Fn(&Entry) -> bool + Sync)>,
}

struct IndexState {
    tree: Tree,
    /// Raw parsed entries by file path (derived fields unset).
    files: HashMap<String, Arc<Entry>>,
    /// Fully derived entries by file path.
    derived: HashMap<String, Arc<Entry>>,
    nodes: HashMap<EntryId, EntryNode>,
    entries: Arc<Vec<Arc<Entry>>>,
    search: SearchIndex,
}

impl IndexState {
    fn empty() -> Self {
        Self {
            tree: Tree::empty(),
            files: HashMap::new(),
            derived: HashMap::new(),
            nodes: HashMap::new(),
            entries: Arc::new(Vec::new()),
            search: SearchIndex::new(),
        }
    }
}

/// The authoritative in-memory entry index.
///
/// Mutation (`sync_with`, `index_changes`, `seed`) is single-writer: the
/// whole reindex happens under the state write lock and commits atomically.
/// Reads clone the current snapshot `Arc` and are never blocked beyond lock
/// acquisition.
pub struct EntryIndex {
    schema: Arc<Schema>,
    config: Arc<WorkspaceConfig>,
    options: IndexOptions,
    state: RwLock<IndexState>,
    events: broadcast::Sender<IndexEvent>,
}

impl EntryIndex {
    /// Create an empty index bound to a schema and workspace configuration.
    pub fn new(schema: Arc<Schema>, config: Arc<WorkspaceConfig>) -> Self {
        Self::with_options(schema, config, IndexOptions::default())
    }

    pub fn with_options(
        schema: Arc<Schema>,
        config: Arc<WorkspaceConfig>,
        options: IndexOptions,
    ) -> Self {
        let events = channel(options.event_capacity);
        Self {
            schema,
            config,
            options,
            state: RwLock::new(IndexState::empty()),
            events,
        }
    }

    /// The sha of the tree the index currently reflects.
    pub fn sha(&self) -> Sha {
        self.state.read().expect("lock poisoned").tree.sha()
    }

    /// The tree the index currently reflects.
    pub fn tree(&self) -> Tree {
        self.state.read().expect("lock poisoned").tree.clone()
    }

    /// The current sorted entry snapshot.
    pub fn snapshot(&self) -> Arc<Vec<Arc<Entry>>> {
        Arc::clone(&self.state.read().expect("lock poisoned").entries)
    }

    /// Subscribe to index change events.
    pub fn subscribe(&self) -> EventStream {
        self.events.subscribe()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn config(&self) -> &Arc<WorkspaceConfig> {
        &self.config
    }

    /// Bring the index in line with the source's current tree.
    ///
    /// Diffs the remembered tree against `source.tree()`; when nothing
    /// changed the current sha is returned unchanged.
    pub fn sync_with(&self, source: &dyn Source) -> IndexResult<SyncReport> {
        let old_tree = self.tree();
        let new_tree = source.tree()?;
        if old_tree.sha() == new_tree.sha() {
            return Ok(SyncReport {
                sha: old_tree.sha(),
                skipped: Vec::new(),
            });
        }
        let changes = diff_trees(&old_tree, &new_tree, source)?;
        self.index_changes(&changes)
    }

    /// Apply a pre-computed change list.
    ///
    /// Used by transactions that already know the diff. The whole change
    /// list applies atomically: on any error the index is left untouched.
    pub fn index_changes(&self, changes: &[Change]) -> IndexResult<SyncReport> {
        let mut state = self.state.write().expect("lock poisoned");
        if changes.is_empty() {
            return Ok(SyncReport {
                sha: state.tree.sha(),
                skipped: Vec::new(),
            });
        }

        // Work on copies so a failed reindex leaves the index untouched.
        let mut files = state.files.clone();
        let mut search = state.search.clone();
        let mut tree_files = state.tree.to_files();
        let mut affected: BTreeSet<EntryId> = BTreeSet::new();
        let mut skipped: Vec<SkippedFile> = Vec::new();

        for change in changes {
            match change {
                Change::Delete { path, .. } => {
                    tree_files.remove(path.as_str());
                    if let Some(old) = files.remove(path.as_str()) {
                        search.remove(path);
                        affected.insert(old.id.clone());
                    }
                }
                Change::Add {
                    path,
                    sha,
                    contents,
                } => {
                    tree_files.insert(path.clone(), *sha);
                    if !path.ends_with(".json") {
                        // Binary asset or unrelated file; tracked in the
                        // tree but not indexed.
                        continue;
                    }
                    match Entry::parse(path, contents, &self.schema, &self.config) {
                        Ok(entry) => {
                            search.insert(
                                path,
                                &entry.title,
                                &entry.searchable_text,
                            );
                            affected.insert(entry.id.clone());
                            files.insert(path.clone(), Arc::new(entry));
                        }
                        Err(err) => match self.options.invalid_entry {
                            InvalidEntryPolicy::Fail => return Err(err),
                            InvalidEntryPolicy::Skip => {
                                warn!(path = %path, error = %err, "skipping invalid entry file");
                                skipped.push(SkippedFile {
                                    path: path.clone(),
                                    reason: err.to_string(),
                                });
                            }
                        },
                    }
                }
            }
        }

        let tree = Tree::from_files(tree_files);
        let (nodes, derived, entries) = recompute(&files)?;

        // Derived state can shift on entries no change touched directly
        // (an ancestor moved or archived); those ids get events too.
        for (path, entry) in &derived {
            if state.derived.get(path) != Some(entry) {
                affected.insert(entry.id.clone());
            }
        }

        debug!(
            sha = %tree.sha().short_hex(),
            changes = changes.len(),
            entries = entries.len(),
            skipped = skipped.len(),
            "reindexed"
        );

        state.tree = tree;
        state.files = files;
        state.search = search;
        state.nodes = nodes;
        state.derived = derived;
        state.entries = Arc::new(entries);
        let sha = state.tree.sha();
        drop(state);

        for id in affected {
            let _ = self.events.send(IndexEvent::Entry(id));
        }
        let _ = self.events.send(IndexEvent::Index(sha));

        Ok(SyncReport { sha, skipped })
    }

    /// Ensure configured seed entries exist, creating missing ones through
    /// the source, then resync.
    pub fn seed(&self, source: &Arc<dyn Source>) -> IndexResult<SyncReport> {
        let mut tx = SourceTransaction::new(Arc::clone(source))?;
        let snapshot = self.snapshot();

        for root in self.config.roots.values() {
            let locales: Vec<Option<String>> = if root.i18n_enabled() {
                root.locales.iter().cloned().map(Some).collect()
            } else {
                vec![None]
            };
            for seed in &root.seeds {
                for locale in &locales {
                    if snapshot.iter().any(|e| {
                        e.root == root.name
                            && e.locale == *locale
                            && e.seeded.as_deref() == Some(seed.path.as_str())
                    }) {
                        continue;
                    }
                    let file_path = seed_file_path(&root.name, locale.as_deref(), seed);
                    if tx.base().contains(&file_path) {
                        continue;
                    }
                    let index = next_sibling_index(&snapshot, &root.name, locale, seed)?;
                    let mut data = seed.data.clone();
                    data.entry("title".to_string())
                        .or_insert_with(|| serde_json::Value::String(seed.slug().to_string()));
                    let record = EntryRecord::new(
                        folio_types::EntryMeta {
                            id: EntryId::generate(),
                            type_name: seed.type_name.clone(),
                            index,
                            seeded: Some(seed.path.clone()),
                        },
                        data,
                    );
                    debug!(path = %file_path, "creating seeded entry");
                    tx.add(file_path, record.encode())?;
                }
            }
        }

        if !tx.is_empty() {
            tx.commit()?;
        }
        self.sync_with(source.as_ref())
    }

    /// First entry matching the predicate, in snapshot order.
    pub fn find_first(&self, predicate: impl Fn(&Entry) -> bool) -> Option<Arc<Entry>> {
        self.snapshot().iter().find(|e| predicate(e)).cloned()
    }

    /// All entries matching the predicate, in snapshot order.
    pub fn find_many(&self, predicate: impl Fn(&Entry) -> bool) -> Vec<Arc<Entry>> {
        self.snapshot()
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect()
    }

    /// Full-text search, best matches first.
    pub fn search(
        &self,
        terms: &str,
        predicate: Option<&(dyn Fn(&Entry) -> bool + Sync)>,
    ) -> Vec<Arc<Entry>> {
        let state = self.state.read().expect("lock poisoned");
        let hits = state.search.search(terms);
        hits.into_iter()
            .filter_map(|(path, _)| state.derived.get(&path).cloned())
            .filter(|e| predicate.map_or(true, |p| p(e)))
            .collect()
    }

    /// Combined filtering with optional preview substitution.
    ///
    /// When a caller is mid-edit, the in-flight `preview` entry substitutes
    /// for its on-disk counterpart (matched by id, locale, and phase) in
    /// the result set without being written to the tree.
    pub fn filter(
        &self,
        options: FilterOptions<'_>,
        preview: Option<&Arc<Entry>>,
    ) -> Vec<Arc<Entry>> {
        let mut candidates: Vec<Arc<Entry>> = if let Some(terms) = options.search {
            self.search(terms, None)
        } else {
            self.snapshot().as_ref().clone()
        };

        if let Some(preview) = preview {
            let mut replaced = false;
            for slot in candidates.iter_mut() {
                if slot.id == preview.id
                    && slot.locale == preview.locale
                    && slot.phase == preview.phase
                {
                    *slot = Arc::clone(preview);
                    replaced = true;
                }
            }
            if !replaced && options.search.is_none() {
                candidates.push(Arc::clone(preview));
                candidates.sort_by(|a, b| {
                    a.index
                        .cmp(&b.index)
                        .then_with(|| a.file_path.cmp(&b.file_path))
                });
            }
        }

        candidates
            .into_iter()
            .filter(|e| {
                options
                    .ids
                    .map_or(true, |ids| ids.iter().any(|id| *id == e.id))
            })
            .filter(|e| options.condition.map_or(true, |c| c(e)))
            .collect()
    }
}

fn seed_file_path(root: &str, locale: Option<&str>, seed: &SeedEntry) -> String {
    let mut parts = vec![root.to_string()];
    if let Some(locale) = locale {
        parts.push(locale.to_string());
    }
    let mut segments: Vec<&str> = seed.path.split('/').collect();
    let slug = segments.pop().unwrap_or(&seed.path);
    parts.extend(segments.iter().map(|s| s.to_string()));
    parts.push(EntryPhase::Published.file_name(slug));
    parts.join("/")
}

fn next_sibling_index(
    snapshot: &[Arc<Entry>],
    root: &str,
    locale: &Option<String>,
    seed: &SeedEntry,
) -> IndexResult<FracKey> {
    let parent_depth = seed.path.split('/').count() as u32 - 1;
    let last = snapshot
        .iter()
        .filter(|e| {
            e.root == root && e.locale == *locale && e.level == parent_depth && e.main
        })
        .map(|e| e.index.clone())
        .max();
    Ok(FracKey::between(last.as_ref(), None)?)
}

type Recomputed = (
    HashMap<EntryId, EntryNode>,
    HashMap<String, Arc<Entry>>,
    Vec<Arc<Entry>>,
);

/// Rebuild nodes and derived entry state from the raw parsed files.
///
/// Validates invariants across the whole tree, resolves parent links,
/// propagates archived status down the hierarchy, computes active/main
/// flags and urls, and returns the sorted snapshot.
fn recompute(files: &HashMap<String, Arc<Entry>>) -> IndexResult<Recomputed> {
    // Deterministic processing order.
    let mut paths: Vec<&String> = files.keys().collect();
    paths.sort();

    // Map (locale, children_dir) -> owning id, catching sibling path
    // duplicates (two ids sharing one slug under one parent).
    let mut dir_owner: HashMap<(Option<String>, String), EntryId> = HashMap::new();
    for path in &paths {
        let entry = &files[*path];
        let key = (entry.locale.clone(), entry.children_dir.clone());
        if let Some(existing) = dir_owner.get(&key) {
            if *existing != entry.id {
                return Err(IntegrityError::DuplicatePath {
                    dir: entry.parent_dir.clone(),
                    path: entry.path.clone(),
                    first: existing.clone(),
                    second: entry.id.clone(),
                }
                .into());
            }
        } else {
            dir_owner.insert(key, entry.id.clone());
        }
    }

    // Group variants into nodes, enforcing per-id invariants.
    let mut raw_nodes: HashMap<EntryId, EntryNode> = HashMap::new();
    for path in &paths {
        let entry = &files[*path];
        raw_nodes
            .entry(entry.id.clone())
            .or_insert_with(|| EntryNode::new(entry.id.clone()))
            .insert(Arc::clone(entry))
            .map_err(IndexError::from)?;
    }

    // Propagate archived status top-down: a subtree under an archived main
    // variant is effectively archived regardless of stored phase.
    let mut by_level: Vec<&Arc<Entry>> = files.values().collect();
    by_level.sort_by_key(|e| (e.level, e.file_path.clone()));
    let mut archived_dirs: HashMap<(Option<String>, String), bool> = HashMap::new();
    for entry in &by_level {
        let node = &raw_nodes[&entry.id];
        let set = node.locale(&entry.locale).expect("variant just inserted");
        let main = set.main().expect("non-empty set");
        let under = *archived_dirs
            .get(&(entry.locale.clone(), entry.parent_dir.clone()))
            .unwrap_or(&false);
        let subtree_archived = under || main.phase == EntryPhase::Archived;
        archived_dirs.insert(
            (entry.locale.clone(), entry.children_dir.clone()),
            subtree_archived,
        );
    }

    // Derive the final entries.
    let mut derived: HashMap<String, Arc<Entry>> = HashMap::with_capacity(files.len());
    let mut nodes: HashMap<EntryId, EntryNode> = HashMap::new();
    let mut entries: Vec<Arc<Entry>> = Vec::with_capacity(files.len());

    for path in &paths {
        let raw = &files[*path];
        let node = &raw_nodes[&raw.id];
        let set = node.locale(&raw.locale).expect("variant exists");

        let parent_id = if raw.level == 0 {
            None
        } else {
            dir_owner
                .get(&(raw.locale.clone(), raw.parent_dir.clone()))
                .cloned()
        };

        if let Some(parent_id) = &parent_id {
            let parent_set = raw_nodes
                .get(parent_id)
                .and_then(|n| n.locale(&raw.locale));
            check_child_allowed(raw, parent_set).map_err(IndexError::from)?;
        }

        let under_archived = *archived_dirs
            .get(&(raw.locale.clone(), raw.parent_dir.clone()))
            .unwrap_or(&false);
        let status = if under_archived {
            EntryPhase::Archived
        } else {
            raw.phase
        };

        let mut entry = (**raw).clone();
        entry.parent_id = parent_id;
        entry.status = status;
        entry.active = set.active().map(|e| e.file_path == entry.file_path) == Some(true);
        entry.main = set.main().map(|e| e.file_path == entry.file_path) == Some(true);
        entry.url = derive_url(&entry);

        let entry = Arc::new(entry);
        nodes
            .entry(entry.id.clone())
            .or_insert_with(|| EntryNode::new(entry.id.clone()))
            .insert(Arc::clone(&entry))
            .map_err(IndexError::from)?;
        derived.insert((*path).clone(), Arc::clone(&entry));
        entries.push(entry);
    }

    entries.sort_by(|a, b| {
        a.index
            .cmp(&b.index)
            .then_with(|| a.file_path.cmp(&b.file_path))
    });

    Ok((nodes, derived, entries))
}

/// Derive the public url from the file path: ancestor slugs joined below
/// the root (and locale) directory, with a trailing `index` segment folded
/// into its parent.
fn derive_url(entry: &Entry) -> String {
    let mut segments: Vec<&str> = entry.file_path.split('/').collect();
    segments.pop(); // file name; slug re-added below
    segments.remove(0); // root directory is not part of the url
    if entry.locale.is_some() && !segments.is_empty() {
        segments.remove(0);
    }
    if entry.path != "index" {
        segments.push(&entry.path);
    }
    let mut url = String::from("/");
    if let Some(locale) = &entry.locale {
        url.push_str(locale);
        if !segments.is_empty() {
            url.push('/');
        }
    }
    url.push_str(&segments.join("/"));
    url
}
