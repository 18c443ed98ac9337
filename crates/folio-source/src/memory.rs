use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use folio_types::Sha;

use crate::change::Change;
use crate::error::{SourceError, SourceResult};
use crate::source::Source;
use crate::tree::Tree;

/// In-memory, HashMap-backed source.
///
/// Intended for tests and embedding. The current tree and all blobs are held
/// behind `RwLock`s; blobs are kept for superseded trees as well, so a diff
/// against an older remembered tree can still read its contents.
pub struct InMemorySource {
    tree: RwLock<Tree>,
    blobs: RwLock<HashMap<Sha, Vec<u8>>>,
}

impl InMemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(Tree::empty()),
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Create a source pre-populated from `(path, contents)` pairs.
    pub fn with_files<P, C>(files: impl IntoIterator<Item = (P, C)>) -> SourceResult<Self>
    where
        P: Into<String>,
        C: Into<Vec<u8>>,
    {
        let source = Self::new();
        let changes: Vec<Change> = files
            .into_iter()
            .map(|(p, c)| Change::add(p, c.into()))
            .collect();
        source.apply(&changes)?;
        Ok(source)
    }

    /// Number of stored blobs (including superseded ones).
    pub fn blob_count(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl Source for InMemorySource {
    fn tree(&self) -> SourceResult<Tree> {
        Ok(self.tree.read().expect("lock poisoned").clone())
    }

    fn read(&self, sha: &Sha) -> SourceResult<Option<Vec<u8>>> {
        Ok(self.blobs.read().expect("lock poisoned").get(sha).cloned())
    }

    fn apply(&self, changes: &[Change]) -> SourceResult<Tree> {
        let mut tree = self.tree.write().expect("lock poisoned");
        let mut files = tree.to_files();
        let mut new_blobs: Vec<(Sha, Vec<u8>)> = Vec::new();

        // Validate against a working copy first so failures leave the
        // published tree untouched.
        for change in changes {
            match change {
                Change::Add {
                    path,
                    sha,
                    contents,
                } => {
                    if files.contains_key(path) {
                        return Err(SourceError::PathExists(path.clone()));
                    }
                    files.insert(path.clone(), *sha);
                    new_blobs.push((*sha, contents.clone()));
                }
                Change::Delete { path, sha } => {
                    let actual = files
                        .get(path)
                        .copied()
                        .ok_or_else(|| SourceError::PathNotFound(path.clone()))?;
                    if actual != *sha {
                        return Err(SourceError::StaleChange {
                            path: path.clone(),
                            expected: *sha,
                            actual,
                        });
                    }
                    files.remove(path);
                }
            }
        }

        let next = Tree::from_files(files);
        debug!(
            from = %tree.sha().short_hex(),
            into = %next.sha().short_hex(),
            changes = changes.len(),
            "applying source changes"
        );

        let mut blobs = self.blobs.write().expect("lock poisoned");
        for (sha, contents) in new_blobs {
            blobs.entry(sha).or_insert(contents);
        }
        *tree = next.clone();
        Ok(next)
    }
}
