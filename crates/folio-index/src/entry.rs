//! One indexed entry: a single phase and locale revision of a content node.

use serde_json::{Map, Value};

use folio_schema::{Schema, WorkspaceConfig};
use folio_types::{ContentHasher, EntryId, EntryPhase, EntryRecord, FracKey, Sha};

use crate::error::{IndexError, IndexResult};

/// One stored revision of one logical node, one locale, one phase.
///
/// Everything below `active` is derived during reindexing; a freshly parsed
/// entry carries placeholder derived state until the index recomputes it.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    /// Stable id shared across phases and locales.
    pub id: EntryId,
    /// Groups locale siblings of the same logical entry.
    pub i18n_id: EntryId,
    pub type_name: String,
    /// Phase stored in the file name.
    pub phase: EntryPhase,
    /// Effective phase: archived when any ancestor's main variant is
    /// archived, otherwise equal to `phase`.
    pub status: EntryPhase,
    pub locale: Option<String>,
    pub workspace: String,
    pub root: String,
    /// Slug segment (file name without phase suffix).
    pub path: String,
    /// Same-locale parent, derived from directory nesting.
    pub parent_id: Option<EntryId>,
    /// Directory containing this entry's file.
    pub parent_dir: String,
    /// Directory this entry's children live in.
    pub children_dir: String,
    /// Depth below the root (and locale) directory.
    pub level: u32,
    /// Fractional sibling ordering key.
    pub index: FracKey,
    pub data: Map<String, Value>,
    pub title: String,
    /// Public url, derived from ancestor slugs.
    pub url: String,
    pub seeded: Option<String>,
    /// Full path of the backing file within the tree.
    pub file_path: String,
    /// Content hash of the file bytes.
    pub file_hash: Sha,
    /// Content hash of the parsed row, independent of formatting.
    pub row_hash: Sha,
    /// Whether this is the variant an editor should see.
    pub active: bool,
    /// Whether this is the canonical public variant.
    pub main: bool,
    /// Concatenated searchable field text.
    pub searchable_text: String,
}

impl Entry {
    /// Parse one tree file into an entry.
    ///
    /// Resolves root and locale from the leading path segments against the
    /// workspace configuration and decodes the record body. Derived fields
    /// (`parent_id`, `status`, `url`, `active`, `main`) are placeholders
    /// until the index recomputes them.
    pub fn parse(
        file_path: &str,
        contents: &[u8],
        schema: &Schema,
        config: &WorkspaceConfig,
    ) -> IndexResult<Self> {
        let invalid = |reason: &str| IndexError::InvalidEntry {
            path: file_path.to_string(),
            reason: reason.to_string(),
        };

        let segments: Vec<&str> = file_path.split('/').collect();
        if segments.len() < 2 {
            return Err(invalid("file is not under a root directory"));
        }
        let root = config
            .root(segments[0])
            .ok_or_else(|| invalid(&format!("unknown root {:?}", segments[0])))?;

        let (locale, body_segments) = if root.i18n_enabled() {
            if segments.len() < 3 {
                return Err(invalid("missing locale segment"));
            }
            let locale = segments[1];
            root.check_locale(Some(locale))
                .map_err(|e| invalid(&e.to_string()))?;
            (Some(locale.to_string()), &segments[2..])
        } else {
            (None, &segments[1..])
        };

        let file_name = body_segments.last().expect("at least one segment");
        let (slug, phase) = EntryPhase::parse_file_name(file_name)
            .ok_or_else(|| invalid("file name does not follow the entry convention"))?;

        let record = EntryRecord::decode(contents)
            .map_err(|e| invalid(&e.to_string()))?;

        let type_def = schema
            .get(&record.meta.type_name)
            .ok_or_else(|| invalid(&format!("unknown type {:?}", record.meta.type_name)))?;

        let parent_dir = file_path
            .rsplit_once('/')
            .map(|(dir, _)| dir.to_string())
            .expect("segments.len() >= 2");
        let children_dir = format!("{parent_dir}/{slug}");
        let level = (body_segments.len() - 1) as u32;

        let title = record
            .title()
            .map(str::to_string)
            .unwrap_or_else(|| slug.to_string());
        let searchable_text = searchable_text(&record, type_def.searchable_fields());

        Ok(Self {
            id: record.meta.id.clone(),
            i18n_id: record.meta.id.clone(),
            type_name: record.meta.type_name.clone(),
            phase,
            status: phase,
            locale,
            workspace: config.name.clone(),
            root: root.name.clone(),
            path: slug.to_string(),
            parent_id: None,
            parent_dir,
            children_dir,
            level,
            index: record.meta.index.clone(),
            title,
            url: String::new(),
            seeded: record.meta.seeded.clone(),
            file_path: file_path.to_string(),
            file_hash: ContentHasher::FILE.hash(contents),
            row_hash: record.row_hash(),
            data: record.data,
            active: false,
            main: false,
            searchable_text,
        })
    }

    /// Rebuild the record this entry was parsed from.
    pub fn to_record(&self) -> EntryRecord {
        EntryRecord::new(
            folio_types::EntryMeta {
                id: self.id.clone(),
                type_name: self.type_name.clone(),
                index: self.index.clone(),
                seeded: self.seeded.clone(),
            },
            self.data.clone(),
        )
    }

    /// Look up a field by name: entry metadata first, then typed data.
    pub fn resolve_field(&self, name: &str) -> Option<Value> {
        let meta = match name {
            "id" => Some(Value::String(self.id.to_string())),
            "i18nId" => Some(Value::String(self.i18n_id.to_string())),
            "type" => Some(Value::String(self.type_name.clone())),
            "path" => Some(Value::String(self.path.clone())),
            "title" => Some(Value::String(self.title.clone())),
            "url" => Some(Value::String(self.url.clone())),
            "locale" => Some(match &self.locale {
                Some(l) => Value::String(l.clone()),
                None => Value::Null,
            }),
            "workspace" => Some(Value::String(self.workspace.clone())),
            "root" => Some(Value::String(self.root.clone())),
            "level" => Some(Value::from(self.level)),
            "index" => Some(Value::String(self.index.to_string())),
            "parent" => Some(match &self.parent_id {
                Some(p) => Value::String(p.to_string()),
                None => Value::Null,
            }),
            "status" => Some(Value::String(self.status.to_string())),
            _ => None,
        };
        meta.or_else(|| self.data.get(name).cloned())
    }
}

fn searchable_text<'a>(
    record: &EntryRecord,
    fields: impl Iterator<Item = &'a str>,
) -> String {
    let mut out = String::new();
    for field in fields {
        if let Some(value) = record.data.get(field) {
            collect_text(value, &mut out);
        }
    }
    out
}

fn collect_text(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(s);
        }
        Value::Array(items) => items.iter().for_each(|v| collect_text(v, out)),
        Value::Object(fields) => fields.values().for_each(|v| collect_text(v, out)),
        _ => {}
    }
}
