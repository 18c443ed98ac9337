//! Variant aggregation: every phase and locale revision of one id.

use std::collections::BTreeMap;
use std::sync::Arc;

use folio_types::{EntryId, EntryPhase};

use crate::entry::Entry;
use crate::error::IntegrityError;

/// At most one entry per phase for one `(id, locale)` pair.
#[derive(Clone, Debug, Default)]
pub struct PhaseSet {
    draft: Option<Arc<Entry>>,
    published: Option<Arc<Entry>>,
    archived: Option<Arc<Entry>>,
}

impl PhaseSet {
    pub fn get(&self, phase: EntryPhase) -> Option<&Arc<Entry>> {
        match phase {
            EntryPhase::Draft => self.draft.as_ref(),
            EntryPhase::Published => self.published.as_ref(),
            EntryPhase::Archived => self.archived.as_ref(),
        }
    }

    fn slot(&mut self, phase: EntryPhase) -> &mut Option<Arc<Entry>> {
        match phase {
            EntryPhase::Draft => &mut self.draft,
            EntryPhase::Published => &mut self.published,
            EntryPhase::Archived => &mut self.archived,
        }
    }

    /// The variant an editor should see: draft, else published, else
    /// archived.
    pub fn active(&self) -> Option<&Arc<Entry>> {
        self.draft
            .as_ref()
            .or(self.published.as_ref())
            .or(self.archived.as_ref())
    }

    /// The canonical public variant: published, else archived, else draft.
    pub fn main(&self) -> Option<&Arc<Entry>> {
        self.published
            .as_ref()
            .or(self.archived.as_ref())
            .or(self.draft.as_ref())
    }

    /// All present variants in phase order.
    pub fn variants(&self) -> impl Iterator<Item = &Arc<Entry>> {
        EntryPhase::ALL.iter().filter_map(|p| self.get(*p))
    }

    /// Returns `true` if a published variant exists.
    pub fn has_published(&self) -> bool {
        self.published.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.draft.is_none() && self.published.is_none() && self.archived.is_none()
    }
}

/// All `(locale, phase)` variants sharing one stable id.
///
/// Insertion enforces the per-id invariants: variants agree on type and
/// root, each `(locale, phase)` slot holds at most one entry, and localized
/// and unlocalized variants never mix.
#[derive(Clone, Debug)]
pub struct EntryNode {
    id: EntryId,
    locales: BTreeMap<Option<String>, PhaseSet>,
}

impl EntryNode {
    pub fn new(id: EntryId) -> Self {
        Self {
            id,
            locales: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &EntryId {
        &self.id
    }

    /// Insert one variant, validating the per-id invariants.
    pub fn insert(&mut self, entry: Arc<Entry>) -> Result<(), IntegrityError> {
        debug_assert_eq!(entry.id, self.id);
        if let Some(existing) = self.any_variant() {
            if existing.type_name != entry.type_name {
                return Err(IntegrityError::TypeMismatch {
                    id: self.id.clone(),
                    existing: existing.type_name.clone(),
                    incoming: entry.type_name.clone(),
                });
            }
            if existing.root != entry.root {
                return Err(IntegrityError::RootMismatch {
                    id: self.id.clone(),
                    existing: existing.root.clone(),
                    incoming: entry.root.clone(),
                });
            }
            if existing.locale.is_some() != entry.locale.is_some() {
                return Err(IntegrityError::LocaleMixing {
                    id: self.id.clone(),
                });
            }
        }
        let set = self.locales.entry(entry.locale.clone()).or_default();
        let slot = set.slot(entry.phase);
        if slot.is_some() {
            return Err(IntegrityError::DuplicatePhase {
                id: self.id.clone(),
                locale: entry.locale.clone(),
                phase: entry.phase,
            });
        }
        *slot = Some(entry);
        Ok(())
    }

    /// Remove one variant. Returns the removed entry, if present.
    pub fn remove(&mut self, locale: &Option<String>, phase: EntryPhase) -> Option<Arc<Entry>> {
        let set = self.locales.get_mut(locale)?;
        let removed = set.slot(phase).take();
        if set.is_empty() {
            self.locales.remove(locale);
        }
        removed
    }

    /// The phase set for one locale.
    pub fn locale(&self, locale: &Option<String>) -> Option<&PhaseSet> {
        self.locales.get(locale)
    }

    /// All locales with at least one variant.
    pub fn locales(&self) -> impl Iterator<Item = (&Option<String>, &PhaseSet)> {
        self.locales.iter()
    }

    /// Every variant across all locales and phases.
    pub fn variants(&self) -> impl Iterator<Item = &Arc<Entry>> {
        self.locales.values().flat_map(PhaseSet::variants)
    }

    /// Returns `true` when the last variant is gone; the index then drops
    /// the node.
    pub fn is_empty(&self) -> bool {
        self.locales.is_empty()
    }

    fn any_variant(&self) -> Option<&Arc<Entry>> {
        self.variants().next()
    }
}

/// The parent-phase rule, shared by the indexing and transaction paths.
///
/// A child under a parent with no published variant may only exist as a
/// draft; anything else is an integrity violation.
pub fn check_child_allowed(
    child: &Entry,
    parent: Option<&PhaseSet>,
) -> Result<(), IntegrityError> {
    let Some(parent) = parent else {
        return Ok(());
    };
    if child.phase != EntryPhase::Draft && !parent.has_published() {
        let parent_id = parent
            .main()
            .map(|e| e.id.clone())
            .unwrap_or_else(|| child.parent_id.clone().unwrap_or_else(|| child.id.clone()));
        return Err(IntegrityError::ChildOfUnpublishedParent {
            id: child.id.clone(),
            parent: parent_id,
            phase: child.phase,
        });
    }
    Ok(())
}
