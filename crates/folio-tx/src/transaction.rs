//! Snapshot-bound entry transactions.
//!
//! A transaction binds to one index snapshot at construction and fast-fails
//! with [`TxError::ShaMismatch`] when the index has already moved past it.
//! Operations validate against that snapshot, check the [`Policy`], and
//! stage file-level changes; nothing is written until the compiled
//! [`CommitRequest`] is applied. No lock is taken: conflicting concurrent
//! transactions are expected and resolved by retrying on a fresh snapshot.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use folio_index::{Entry, EntryIndex, IntegrityError};
use folio_source::Tree;
use folio_types::{slugify, ContentHasher, EntryId, EntryPhase, FracKey, Sha};

use crate::error::{TxError, TxResult};
use crate::policy::{Permission, Policy};
use crate::request::{CommitChange, CommitRequest};

/// Where a created entry lands among its siblings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum InsertOrder {
    First,
    #[default]
    Last,
    /// Directly after an existing sibling.
    After(EntryId),
}

/// Specification for [`EntryTransaction::create`].
#[derive(Clone, Debug)]
pub struct CreateEntry {
    pub type_name: String,
    pub root: String,
    pub locale: Option<String>,
    pub parent: Option<EntryId>,
    pub title: String,
    pub data: Map<String, Value>,
    pub phase: EntryPhase,
    pub order: InsertOrder,
    /// Explicit id, used when creating a locale variant of an existing
    /// entry. Generated when absent.
    pub id: Option<EntryId>,
}

impl CreateEntry {
    pub fn new(type_name: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            root: root.into(),
            locale: None,
            parent: None,
            title: String::new(),
            data: Map::new(),
            phase: EntryPhase::Published,
            order: InsertOrder::Last,
            id: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_parent(mut self, parent: EntryId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    pub fn with_phase(mut self, phase: EntryPhase) -> Self {
        self.phase = phase;
        self
    }

    pub fn with_order(mut self, order: InsertOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_id(mut self, id: EntryId) -> Self {
        self.id = Some(id);
        self
    }
}

/// Specification for [`EntryTransaction::update`].
#[derive(Clone, Debug)]
pub struct UpdateEntry {
    pub id: EntryId,
    pub locale: Option<String>,
    /// Partial field patch merged over the existing data.
    pub patch: Map<String, Value>,
    /// New slug for the active variant. Renaming a published variant is
    /// structural: the archived sibling file and the descendant subtree
    /// follow the new slug. Renaming a draft moves only the draft file;
    /// the canonical slug changes at publish time.
    pub path: Option<String>,
}

impl UpdateEntry {
    pub fn new(id: EntryId) -> Self {
        Self {
            id,
            locale: None,
            patch: Map::new(),
            path: None,
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_patch(mut self, patch: Map<String, Value>) -> Self {
        self.patch = patch;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Specification for [`EntryTransaction::move_entry`].
#[derive(Clone, Debug)]
pub struct MoveEntry {
    pub id: EntryId,
    pub locale: Option<String>,
    /// Sibling to land directly after; `None` means first.
    pub after: Option<EntryId>,
    /// Re-parent under this entry.
    pub to_parent: Option<EntryId>,
    /// Re-parent to the top level of this root.
    pub to_root: Option<String>,
}

impl MoveEntry {
    pub fn new(id: EntryId) -> Self {
        Self {
            id,
            locale: None,
            after: None,
            to_parent: None,
            to_root: None,
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn after(mut self, id: EntryId) -> Self {
        self.after = Some(id);
        self
    }

    pub fn to_parent(mut self, id: EntryId) -> Self {
        self.to_parent = Some(id);
        self
    }

    pub fn to_root(mut self, root: impl Into<String>) -> Self {
        self.to_root = Some(root.into());
        self
    }
}

/// A mutation batch bound to one index snapshot.
pub struct EntryTransaction<'a> {
    index: &'a EntryIndex,
    policy: &'a dyn Policy,
    from: Tree,
    snapshot: Arc<Vec<Arc<Entry>>>,
    working: BTreeMap<String, Sha>,
    checks: Vec<(String, Sha)>,
    changes: Vec<CommitChange>,
    /// Ordering keys staged by creates, per `(parent_dir, locale)`.
    staged_keys: HashMap<(String, Option<String>), Vec<FracKey>>,
}

impl std::fmt::Debug for EntryTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryTransaction")
            .field("from", &self.from)
            .field("working", &self.working)
            .field("checks", &self.checks)
            .field("changes", &self.changes)
            .field("staged_keys", &self.staged_keys)
            .finish_non_exhaustive()
    }
}

impl<'a> EntryTransaction<'a> {
    /// Bind to the index's current snapshot.
    pub fn new(index: &'a EntryIndex, policy: &'a dyn Policy) -> Self {
        let from = index.tree();
        let working = from.to_files();
        Self {
            index,
            policy,
            from,
            snapshot: index.snapshot(),
            working,
            checks: Vec::new(),
            changes: Vec::new(),
            staged_keys: HashMap::new(),
        }
    }

    /// Bind to a caller-held tree, failing when the index has moved past it.
    pub fn from_tree(index: &'a EntryIndex, from: Tree, policy: &'a dyn Policy) -> TxResult<Self> {
        let actual = index.sha();
        if actual != from.sha() {
            return Err(TxError::ShaMismatch {
                expected: from.sha(),
                actual,
            });
        }
        let working = from.to_files();
        Ok(Self {
            index,
            policy,
            from,
            snapshot: index.snapshot(),
            working,
            checks: Vec::new(),
            changes: Vec::new(),
            staged_keys: HashMap::new(),
        })
    }

    /// The sha of the bound base tree.
    pub fn sha(&self) -> Sha {
        self.from.sha()
    }

    /// Returns `true` if nothing has been staged.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Create an entry. Returns the new entry's id.
    pub fn create(&mut self, spec: CreateEntry) -> TxResult<EntryId> {
        self.policy.check(Permission::Create, None)?;
        let config = Arc::clone(self.index.config());
        let schema = Arc::clone(self.index.schema());
        let root = config.require_root(&spec.root)?;
        root.check_locale(spec.locale.as_deref())?;
        let type_def = schema.require(&spec.type_name)?;

        let parent = match &spec.parent {
            Some(pid) => Some(self.main_of(pid, &spec.locale)?),
            None => None,
        };
        let parent_dir = match &parent {
            Some(parent) => {
                let parent_type = schema.require(&parent.type_name)?;
                if !parent_type.admits_child(&spec.type_name) {
                    return Err(TxError::ChildNotAllowed {
                        parent_type: parent.type_name.clone(),
                        child_type: spec.type_name.clone(),
                    });
                }
                if spec.phase != EntryPhase::Draft
                    && !self.has_phase(&parent.id, &spec.locale, EntryPhase::Published)
                {
                    return Err(IntegrityError::ChildOfUnpublishedParent {
                        id: spec.id.clone().unwrap_or_else(EntryId::generate),
                        parent: parent.id.clone(),
                        phase: spec.phase,
                    }
                    .into());
                }
                parent.children_dir.clone()
            }
            None => root_dir(&spec.root, &spec.locale),
        };

        let slug = self.available_slug(&parent_dir, &slugify(&spec.title));
        let index = self.placement_key(&parent_dir, &spec.locale, &spec.order)?;

        let id = spec.id.clone().unwrap_or_else(EntryId::generate);
        let mut data = spec.data;
        data.insert("title".to_string(), Value::String(spec.title.clone()));

        // Creating a locale variant of an existing entry pulls the
        // locale-shared field values from an existing translation.
        if spec.id.is_some() {
            if let Some(translation) = self
                .snapshot
                .iter()
                .find(|e| e.id == id && e.locale != spec.locale && e.main)
                .cloned()
            {
                for field in type_def.shared_fields() {
                    if let Some(value) = translation.data.get(field) {
                        data.insert(field.to_string(), value.clone());
                    }
                }
            }
        }

        let record = folio_types::EntryRecord::new(
            folio_types::EntryMeta {
                id: id.clone(),
                type_name: spec.type_name.clone(),
                index: index.clone(),
                seeded: None,
            },
            data,
        );
        let file_path = format!("{parent_dir}/{}", spec.phase.file_name(&slug));
        debug!(path = %file_path, id = %id, "staging create");
        self.stage_add(file_path, record.encode(), false)?;
        self.staged_keys
            .entry((parent_dir, spec.locale))
            .or_default()
            .push(index);
        Ok(id)
    }

    /// Merge a field patch into an entry's active variant, optionally
    /// renaming it.
    pub fn update(&mut self, spec: UpdateEntry) -> TxResult<()> {
        self.policy.check(Permission::Update, Some(&spec.id))?;
        let entry = self.active_of(&spec.id, &spec.locale)?;

        let mut data = entry.data.clone();
        for (key, value) in spec.patch {
            data.insert(key, value);
        }

        let new_path = spec.path.unwrap_or_else(|| entry.path.clone());
        let renaming = new_path != entry.path;
        // Renaming a published entry changes public structure.
        if renaming && entry.phase == EntryPhase::Published {
            self.policy.check(Permission::Publish, Some(&spec.id))?;
        }

        if renaming {
            self.ensure_slug_free(&entry.parent_dir, &new_path)?;
            let record = variant_record(&entry, Some(&data), None);
            let target = format!("{}/{}", entry.parent_dir, entry.phase.file_name(&new_path));
            self.stage_delete(&entry.file_path, false)?;
            self.stage_add(target, record.encode(), false)?;
            if entry.phase == EntryPhase::Published {
                let variants = self.variants(&spec.id, &spec.locale);
                if let Some(archived) =
                    variants.iter().find(|e| e.phase == EntryPhase::Archived)
                {
                    let renamed = format!(
                        "{}/{}",
                        archived.parent_dir,
                        EntryPhase::Archived.file_name(&new_path)
                    );
                    let record = archived.to_record();
                    self.stage_delete(&archived.file_path, false)?;
                    self.stage_add(renamed, record.encode(), false)?;
                }
                let new_children_dir = format!("{}/{new_path}", entry.parent_dir);
                self.move_subtree(&entry.children_dir, &new_children_dir)?;
            }
        } else {
            let record = variant_record(&entry, Some(&data), None);
            self.replace_file(&entry.file_path, record.encode())?;
        }
        Ok(())
    }

    /// Promote an entry's draft (or archived) variant to published.
    pub fn publish(&mut self, id: &EntryId, locale: Option<&str>) -> TxResult<()> {
        self.policy.check(Permission::Publish, Some(id))?;
        let locale = locale.map(str::to_string);
        let variants = self.variants(id, &locale);
        if variants.is_empty() {
            return Err(TxError::EntryNotFound {
                id: id.clone(),
                locale,
            });
        }
        let source = variants
            .iter()
            .find(|e| e.phase == EntryPhase::Draft)
            .or_else(|| variants.iter().find(|e| e.phase == EntryPhase::Archived))
            .cloned()
            .ok_or_else(|| TxError::VariantNotFound {
                id: id.clone(),
                phase: EntryPhase::Draft,
            })?;

        if let Some(pid) = &source.parent_id {
            if !self.has_phase(pid, &locale, EntryPhase::Published) {
                return Err(IntegrityError::ChildOfUnpublishedParent {
                    id: id.clone(),
                    parent: pid.clone(),
                    phase: EntryPhase::Published,
                }
                .into());
            }
        }

        let published = variants
            .iter()
            .find(|e| e.phase == EntryPhase::Published)
            .cloned();

        self.stage_delete(&source.file_path, false)?;
        if let Some(old) = &published {
            self.stage_delete(&old.file_path, false)?;
        }
        let target = format!(
            "{}/{}",
            source.parent_dir,
            EntryPhase::Published.file_name(&source.path)
        );
        self.stage_add(target, source.to_record().encode(), false)?;

        // The canonical slug changed: sibling-phase files and the whole
        // descendant subtree follow it.
        if let Some(old) = &published {
            if old.path != source.path {
                if let Some(archived) = variants
                    .iter()
                    .find(|e| e.phase == EntryPhase::Archived && e.path != source.path)
                {
                    let renamed = format!(
                        "{}/{}",
                        archived.parent_dir,
                        EntryPhase::Archived.file_name(&source.path)
                    );
                    self.stage_delete(&archived.file_path, false)?;
                    self.stage_add(renamed, archived.to_record().encode(), false)?;
                }
                let new_children_dir = format!("{}/{}", old.parent_dir, source.path);
                self.move_subtree(&old.children_dir, &new_children_dir)?;
            }
        }

        self.propagate_shared(&source)?;
        Ok(())
    }

    /// Archive an entry's published variant. Children are untouched.
    pub fn archive(&mut self, id: &EntryId, locale: Option<&str>) -> TxResult<()> {
        self.policy.check(Permission::Archive, Some(id))?;
        let locale = locale.map(str::to_string);
        let variants = self.variants(id, &locale);
        let published = variants
            .iter()
            .find(|e| e.phase == EntryPhase::Published)
            .cloned()
            .ok_or_else(|| TxError::VariantNotFound {
                id: id.clone(),
                phase: EntryPhase::Published,
            })?;

        if let Some(old) = variants.iter().find(|e| e.phase == EntryPhase::Archived) {
            self.stage_delete(&old.file_path, false)?;
        }
        self.stage_delete(&published.file_path, false)?;
        let target = format!(
            "{}/{}",
            published.parent_dir,
            EntryPhase::Archived.file_name(&published.path)
        );
        self.stage_add(target, published.to_record().encode(), false)?;
        Ok(())
    }

    /// Reposition an entry among its siblings and/or re-parent it.
    pub fn move_entry(&mut self, spec: MoveEntry) -> TxResult<()> {
        let reparent = spec.to_parent.is_some() || spec.to_root.is_some();
        let permission = if reparent {
            Permission::Move
        } else {
            Permission::Reorder
        };
        self.policy.check(permission, Some(&spec.id))?;

        let entry = self.main_of(&spec.id, &spec.locale)?;
        let schema = Arc::clone(self.index.schema());
        let config = Arc::clone(self.index.config());

        let target_dir = if let Some(pid) = &spec.to_parent {
            let parent = self.main_of(pid, &spec.locale)?;
            if parent.id == entry.id
                || parent.file_path.starts_with(&format!("{}/", entry.children_dir))
            {
                return Err(TxError::MoveIntoOwnSubtree(entry.id.clone()));
            }
            let parent_type = schema.require(&parent.type_name)?;
            if !parent_type.admits_child(&entry.type_name) {
                return Err(TxError::ChildNotAllowed {
                    parent_type: parent.type_name.clone(),
                    child_type: entry.type_name.clone(),
                });
            }
            if entry.phase != EntryPhase::Draft
                && !self.has_phase(&parent.id, &spec.locale, EntryPhase::Published)
            {
                return Err(IntegrityError::ChildOfUnpublishedParent {
                    id: entry.id.clone(),
                    parent: parent.id.clone(),
                    phase: entry.phase,
                }
                .into());
            }
            parent.children_dir.clone()
        } else if let Some(root) = &spec.to_root {
            let root_config = config.require_root(root)?;
            root_config.check_locale(spec.locale.as_deref())?;
            root_dir(root, &spec.locale)
        } else {
            entry.parent_dir.clone()
        };
        if target_dir == entry.children_dir
            || target_dir.starts_with(&format!("{}/", entry.children_dir))
        {
            return Err(TxError::MoveIntoOwnSubtree(entry.id.clone()));
        }

        let mut siblings: Vec<Arc<Entry>> = self
            .snapshot
            .iter()
            .filter(|e| {
                e.main && e.parent_dir == target_dir && e.locale == spec.locale && e.id != entry.id
            })
            .cloned()
            .collect();
        siblings.sort_by(|a, b| {
            a.index
                .cmp(&b.index)
                .then_with(|| a.file_path.cmp(&b.file_path))
        });

        let position = match &spec.after {
            Some(aid) => {
                siblings
                    .iter()
                    .position(|e| e.id == *aid)
                    .ok_or_else(|| TxError::EntryNotFound {
                        id: aid.clone(),
                        locale: spec.locale.clone(),
                    })?
                    + 1
            }
            None => 0,
        };

        // Duplicate keys among the siblings mean ordering has drifted;
        // repair the whole set with fresh evenly spread keys instead of
        // wedging one more key into a broken order.
        let duplicates = siblings.windows(2).any(|w| w[0].index == w[1].index);
        let (new_key, repairs) = if duplicates {
            let mut ordered = siblings.clone();
            ordered.insert(position, Arc::clone(&entry));
            let keys = FracKey::spread(None, None, ordered.len())?;
            let mut own = FracKey::initial();
            let mut repairs: Vec<(Arc<Entry>, FracKey)> = Vec::new();
            for (sibling, key) in ordered.iter().zip(keys) {
                if sibling.id == entry.id {
                    own = key;
                } else if sibling.index != key {
                    repairs.push((Arc::clone(sibling), key));
                }
            }
            (own, repairs)
        } else {
            let lower = position.checked_sub(1).map(|i| siblings[i].index.clone());
            let upper = siblings.get(position).map(|e| e.index.clone());
            (
                FracKey::between(lower.as_ref(), upper.as_ref())?,
                Vec::new(),
            )
        };

        for (sibling, key) in &repairs {
            self.rewrite_index(&sibling.id, &spec.locale, key)?;
        }

        let reparented = target_dir != entry.parent_dir;
        for variant in self.variants(&spec.id, &spec.locale) {
            let record = variant_record(&variant, None, Some(&new_key));
            let target = if reparented {
                format!("{target_dir}/{}", variant.phase.file_name(&variant.path))
            } else {
                variant.file_path.clone()
            };
            self.stage_delete(&variant.file_path, false)?;
            self.stage_add(target, record.encode(), false)?;
        }
        if reparented {
            let new_children_dir = format!("{target_dir}/{}", entry.path);
            self.move_subtree(&entry.children_dir, &new_children_dir)?;
        }
        Ok(())
    }

    /// Remove every variant of an entry, its descendant subtree, and (for
    /// media types) the underlying binary assets.
    pub fn remove(&mut self, id: &EntryId) -> TxResult<()> {
        self.policy.check(Permission::Delete, Some(id))?;
        let schema = Arc::clone(self.index.schema());
        let variants: Vec<Arc<Entry>> =
            self.snapshot.iter().filter(|e| e.id == *id).cloned().collect();
        if variants.is_empty() {
            return Err(TxError::EntryNotFound {
                id: id.clone(),
                locale: None,
            });
        }

        let mut doomed: Vec<Arc<Entry>> = variants.clone();
        for variant in &variants {
            let prefix = format!("{}/", variant.children_dir);
            doomed.extend(
                self.snapshot
                    .iter()
                    .filter(|e| e.file_path.starts_with(&prefix))
                    .cloned(),
            );
        }

        let mut paths: BTreeSet<String> = BTreeSet::new();
        let mut assets: BTreeSet<String> = BTreeSet::new();
        for entry in &doomed {
            paths.insert(entry.file_path.clone());
            let kind = schema.get(&entry.type_name).map(|t| t.kind);
            if kind == Some(folio_schema::TypeKind::MediaFile) {
                if let Some(Value::String(location)) = entry.data.get("location") {
                    assets.insert(location.clone());
                }
            }
        }

        for path in paths {
            self.stage_delete(&path, false)?;
        }
        for asset in assets {
            if self.working.contains_key(&asset) {
                self.stage_delete(&asset, true)?;
            }
        }
        Ok(())
    }

    /// Stage a binary asset upload alongside the entry changes.
    pub fn upload_file(&mut self, path: impl Into<String>, contents: Vec<u8>) -> TxResult<()> {
        self.policy.check(Permission::Upload, None)?;
        self.stage_add(path.into(), contents, true)
    }

    /// Stage a binary asset removal.
    pub fn remove_file(&mut self, path: &str) -> TxResult<()> {
        self.policy.check(Permission::Delete, None)?;
        self.stage_delete(path, true)
    }

    /// Compile the staged changes into a verifiable commit request.
    pub fn into_request(self, description: impl Into<String>) -> CommitRequest {
        let into_sha = Tree::from_files(self.working).sha();
        let request = CommitRequest {
            from_sha: self.from.sha(),
            into_sha,
            description: description.into(),
            checks: self.checks,
            changes: self.changes,
        };
        debug!(
            from = %request.from_sha.short_hex(),
            into = %request.into_sha.short_hex(),
            changes = request.changes.len(),
            checks = request.checks.len(),
            "compiled commit request"
        );
        request
    }

    fn variants(&self, id: &EntryId, locale: &Option<String>) -> Vec<Arc<Entry>> {
        self.snapshot
            .iter()
            .filter(|e| e.id == *id && e.locale == *locale)
            .cloned()
            .collect()
    }

    fn has_phase(&self, id: &EntryId, locale: &Option<String>, phase: EntryPhase) -> bool {
        self.snapshot
            .iter()
            .any(|e| e.id == *id && e.locale == *locale && e.phase == phase)
    }

    fn active_of(&self, id: &EntryId, locale: &Option<String>) -> TxResult<Arc<Entry>> {
        self.snapshot
            .iter()
            .find(|e| e.id == *id && e.locale == *locale && e.active)
            .cloned()
            .ok_or_else(|| TxError::EntryNotFound {
                id: id.clone(),
                locale: locale.clone(),
            })
    }

    fn main_of(&self, id: &EntryId, locale: &Option<String>) -> TxResult<Arc<Entry>> {
        self.snapshot
            .iter()
            .find(|e| e.id == *id && e.locale == *locale && e.main)
            .cloned()
            .ok_or_else(|| TxError::EntryNotFound {
                id: id.clone(),
                locale: locale.clone(),
            })
    }

    /// First free slug in a directory: `slug`, then `slug-2`, `slug-3`, …
    /// A slug is taken when any phase file for it exists.
    fn available_slug(&self, parent_dir: &str, slug: &str) -> String {
        let mut n = 1usize;
        loop {
            let candidate = if n == 1 {
                slug.to_string()
            } else {
                format!("{slug}-{n}")
            };
            let taken = EntryPhase::ALL.iter().any(|phase| {
                self.working
                    .contains_key(&format!("{parent_dir}/{}", phase.file_name(&candidate)))
            });
            if !taken {
                return candidate;
            }
            n += 1;
        }
    }

    fn ensure_slug_free(&self, parent_dir: &str, slug: &str) -> TxResult<()> {
        for phase in EntryPhase::ALL {
            let path = format!("{parent_dir}/{}", phase.file_name(slug));
            if self.working.contains_key(&path) {
                return Err(TxError::PathTaken(path));
            }
        }
        Ok(())
    }

    fn sibling_keys(&self, parent_dir: &str, locale: &Option<String>) -> Vec<FracKey> {
        let mut keys: Vec<FracKey> = self
            .snapshot
            .iter()
            .filter(|e| e.main && e.parent_dir == parent_dir && e.locale == *locale)
            .map(|e| e.index.clone())
            .collect();
        if let Some(staged) = self
            .staged_keys
            .get(&(parent_dir.to_string(), locale.clone()))
        {
            keys.extend(staged.iter().cloned());
        }
        keys.sort();
        keys
    }

    fn placement_key(
        &self,
        parent_dir: &str,
        locale: &Option<String>,
        order: &InsertOrder,
    ) -> TxResult<FracKey> {
        let keys = self.sibling_keys(parent_dir, locale);
        let key = match order {
            InsertOrder::First => FracKey::between(None, keys.first())?,
            InsertOrder::Last => FracKey::between(keys.last(), None)?,
            InsertOrder::After(id) => {
                let anchor = self
                    .snapshot
                    .iter()
                    .find(|e| e.id == *id && e.locale == *locale && e.main)
                    .ok_or_else(|| TxError::EntryNotFound {
                        id: id.clone(),
                        locale: locale.clone(),
                    })?;
                let upper = keys.iter().find(|k| **k > anchor.index);
                FracKey::between(Some(&anchor.index), upper)?
            }
        };
        Ok(key)
    }

    /// Overwrite locale-shared field values on every other-locale published
    /// variant of the same id.
    fn propagate_shared(&mut self, source: &Entry) -> TxResult<()> {
        if source.locale.is_none() {
            return Ok(());
        }
        let schema = Arc::clone(self.index.schema());
        let type_def = schema.require(&source.type_name)?;
        let shared: Vec<String> = type_def.shared_fields().map(str::to_string).collect();
        if shared.is_empty() {
            return Ok(());
        }
        let translations: Vec<Arc<Entry>> = self
            .snapshot
            .iter()
            .filter(|e| {
                e.id == source.id
                    && e.locale != source.locale
                    && e.phase == EntryPhase::Published
            })
            .cloned()
            .collect();
        for translation in translations {
            let mut data = translation.data.clone();
            let mut changed = false;
            for field in &shared {
                let value = source.data.get(field);
                if value != data.get(field) {
                    match value {
                        Some(v) => {
                            data.insert(field.clone(), v.clone());
                        }
                        None => {
                            data.remove(field);
                        }
                    }
                    changed = true;
                }
            }
            if changed {
                let record = variant_record(&translation, Some(&data), None);
                self.replace_file(&translation.file_path, record.encode())?;
            }
        }
        Ok(())
    }

    /// Rewrite every phase file of one entry in place with a new ordering
    /// key.
    fn rewrite_index(
        &mut self,
        id: &EntryId,
        locale: &Option<String>,
        key: &FracKey,
    ) -> TxResult<()> {
        for variant in self.variants(id, locale) {
            let record = variant_record(&variant, None, Some(key));
            self.replace_file(&variant.file_path, record.encode())?;
        }
        Ok(())
    }

    /// Move every snapshot file under `old_prefix` to `new_prefix`.
    fn move_subtree(&mut self, old_prefix: &str, new_prefix: &str) -> TxResult<()> {
        let prefix = format!("{old_prefix}/");
        let descendants: Vec<Arc<Entry>> = self
            .snapshot
            .iter()
            .filter(|e| e.file_path.starts_with(&prefix))
            .cloned()
            .collect();
        for entry in descendants {
            let target = format!("{new_prefix}{}", &entry.file_path[old_prefix.len()..]);
            self.stage_delete(&entry.file_path, false)?;
            self.stage_add(target, entry.to_record().encode(), false)?;
        }
        Ok(())
    }

    fn replace_file(&mut self, path: &str, contents: Vec<u8>) -> TxResult<()> {
        self.stage_delete(path, false)?;
        self.stage_add(path.to_string(), contents, false)
    }

    /// Record the base-tree state of a path as an apply-time check. Each
    /// path is asserted once, at its pre-transaction state.
    fn assert_base(&mut self, path: &str) {
        if self.checks.iter().any(|(p, _)| p == path) {
            return;
        }
        let sha = self.from.get(path).unwrap_or_else(Sha::null);
        self.checks.push((path.to_string(), sha));
    }

    fn stage_add(&mut self, path: String, contents: Vec<u8>, asset: bool) -> TxResult<()> {
        if self.working.contains_key(&path) {
            return Err(TxError::PathTaken(path));
        }
        self.assert_base(&path);
        let sha = ContentHasher::FILE.hash(&contents);
        self.working.insert(path.clone(), sha);
        self.changes.push(if asset {
            CommitChange::UploadFile {
                path,
                sha,
                contents,
            }
        } else {
            CommitChange::AddContent {
                path,
                sha,
                contents,
            }
        });
        Ok(())
    }

    fn stage_delete(&mut self, path: &str, asset: bool) -> TxResult<()> {
        self.assert_base(path);
        let sha = self
            .working
            .remove(path)
            .ok_or_else(|| TxError::PathMissing(path.to_string()))?;
        self.changes.push(if asset {
            CommitChange::RemoveFile {
                path: path.to_string(),
                sha,
            }
        } else {
            CommitChange::DeleteContent {
                path: path.to_string(),
                sha,
            }
        });
        Ok(())
    }
}

fn root_dir(root: &str, locale: &Option<String>) -> String {
    match locale {
        Some(locale) => format!("{root}/{locale}"),
        None => root.to_string(),
    }
}

/// Rebuild a variant's record, optionally overriding its data or ordering
/// key.
fn variant_record(
    entry: &Entry,
    data: Option<&Map<String, Value>>,
    index: Option<&FracKey>,
) -> folio_types::EntryRecord {
    let mut record = entry.to_record();
    if let Some(data) = data {
        record.data = data.clone();
    }
    if let Some(index) = index {
        record.meta.index = index.clone();
    }
    record
}
