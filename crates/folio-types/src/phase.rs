use serde::{Deserialize, Serialize};

/// Revision phase of one entry variant.
///
/// The phase is encoded in the file name, never in the file body:
///
/// - `{path}.json` -- published
/// - `{path}.draft.json` -- draft
/// - `{path}.archived.json` -- archived
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPhase {
    Draft,
    Published,
    Archived,
}

impl EntryPhase {
    /// All phases, in variant-resolution order.
    pub const ALL: [Self; 3] = [Self::Draft, Self::Published, Self::Archived];

    /// The file name for a slug in this phase.
    pub fn file_name(&self, path: &str) -> String {
        match self {
            Self::Published => format!("{path}.json"),
            Self::Draft => format!("{path}.draft.json"),
            Self::Archived => format!("{path}.archived.json"),
        }
    }

    /// Split a file name into its slug and phase.
    ///
    /// Returns `None` for names that do not follow the entry-file
    /// convention (wrong extension, empty slug).
    pub fn parse_file_name(name: &str) -> Option<(&str, Self)> {
        let base = name.strip_suffix(".json")?;
        let (slug, phase) = if let Some(slug) = base.strip_suffix(".draft") {
            (slug, Self::Draft)
        } else if let Some(slug) = base.strip_suffix(".archived") {
            (slug, Self::Archived)
        } else {
            (base, Self::Published)
        };
        if slug.is_empty() {
            return None;
        }
        Some((slug, phase))
    }
}

impl std::fmt::Display for EntryPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Published => write!(f, "published"),
            Self::Archived => write!(f, "archived"),
        }
    }
}
