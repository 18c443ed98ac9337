use serde::{Deserialize, Serialize};

use folio_types::{ContentHasher, Sha};

/// One file-level mutation against a tree.
///
/// A content replacement is expressed as a `Delete` of the old file followed
/// by an `Add` of the new one at the same path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Change {
    /// Add a file with the given contents.
    Add {
        path: String,
        sha: Sha,
        contents: Vec<u8>,
    },
    /// Remove the file, asserting its current content sha.
    Delete { path: String, sha: Sha },
}

impl Change {
    /// Create an add, hashing the contents.
    pub fn add(path: impl Into<String>, contents: Vec<u8>) -> Self {
        let sha = ContentHasher::FILE.hash(&contents);
        Self::Add {
            path: path.into(),
            sha,
            contents,
        }
    }

    /// Create a delete of a file with a known sha.
    pub fn delete(path: impl Into<String>, sha: Sha) -> Self {
        Self::Delete {
            path: path.into(),
            sha,
        }
    }

    /// The path this change touches.
    pub fn path(&self) -> &str {
        match self {
            Self::Add { path, .. } | Self::Delete { path, .. } => path,
        }
    }

    /// The content sha this change carries.
    pub fn sha(&self) -> Sha {
        match self {
            Self::Add { sha, .. } | Self::Delete { sha, .. } => *sha,
        }
    }
}
