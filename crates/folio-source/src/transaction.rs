use std::collections::BTreeMap;
use std::sync::Arc;

use folio_types::{ContentHasher, Sha};

use crate::change::Change;
use crate::error::{SourceError, SourceResult};
use crate::source::Source;
use crate::tree::Tree;

/// A compiled change batch: base tree, resulting tree, and the changes
/// leading from one to the other.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledChanges {
    pub from_sha: Sha,
    pub into_sha: Sha,
    pub changes: Vec<Change>,
}

/// A file-level mutation batch built against a known base tree.
///
/// Operations validate against a working copy of the base listing, so a
/// transaction catches path conflicts at staging time rather than at apply
/// time. Compiling produces the change list plus the sha of the tree the
/// changes lead to.
pub struct SourceTransaction {
    source: Arc<dyn Source>,
    base: Tree,
    working: BTreeMap<String, Sha>,
    changes: Vec<Change>,
}

impl SourceTransaction {
    /// Start a transaction against the source's current tree.
    pub fn new(source: Arc<dyn Source>) -> SourceResult<Self> {
        let base = source.tree()?;
        Ok(Self::from_tree(source, base))
    }

    /// Start a transaction against a specific base tree.
    pub fn from_tree(source: Arc<dyn Source>, base: Tree) -> Self {
        let working = base.to_files();
        Self {
            source,
            base,
            working,
            changes: Vec::new(),
        }
    }

    /// The base tree this transaction was built from.
    pub fn base(&self) -> &Tree {
        &self.base
    }

    /// Stage adding a file.
    pub fn add(&mut self, path: impl Into<String>, contents: Vec<u8>) -> SourceResult<&mut Self> {
        let path = path.into();
        if self.working.contains_key(&path) {
            return Err(SourceError::PathExists(path));
        }
        let sha = ContentHasher::FILE.hash(&contents);
        self.working.insert(path.clone(), sha);
        self.changes.push(Change::Add {
            path,
            sha,
            contents,
        });
        Ok(self)
    }

    /// Stage removing a file.
    pub fn remove(&mut self, path: &str) -> SourceResult<&mut Self> {
        let sha = self
            .working
            .remove(path)
            .ok_or_else(|| SourceError::PathNotFound(path.to_string()))?;
        self.changes.push(Change::delete(path, sha));
        Ok(self)
    }

    /// Stage renaming a file, keeping its contents.
    pub fn rename(&mut self, from: &str, to: &str) -> SourceResult<&mut Self> {
        let sha = self
            .working
            .get(from)
            .copied()
            .ok_or_else(|| SourceError::PathNotFound(from.to_string()))?;
        if self.working.contains_key(to) {
            return Err(SourceError::PathExists(to.to_string()));
        }
        let contents = self
            .source
            .read(&sha)?
            .ok_or(SourceError::BlobNotFound(sha))?;
        self.working.remove(from);
        self.changes.push(Change::delete(from, sha));
        self.working.insert(to.to_string(), sha);
        self.changes.push(Change::Add {
            path: to.to_string(),
            sha,
            contents,
        });
        Ok(self)
    }

    /// Returns `true` if nothing has been staged.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Compile into a change batch.
    pub fn compile(self) -> CompiledChanges {
        let into = Tree::from_files(self.working);
        CompiledChanges {
            from_sha: self.base.sha(),
            into_sha: into.sha(),
            changes: self.changes,
        }
    }

    /// Compile and apply to the underlying source.
    pub fn commit(self) -> SourceResult<Tree> {
        let source = Arc::clone(&self.source);
        let compiled = self.compile();
        let tree = source.apply(&compiled.changes)?;
        debug_assert_eq!(tree.sha(), compiled.into_sha);
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySource;

    fn source_with(files: &[(&str, &[u8])]) -> Arc<InMemorySource> {
        Arc::new(
            InMemorySource::with_files(files.iter().map(|(p, c)| (*p, c.to_vec()))).unwrap(),
        )
    }

    #[test]
    fn add_remove_rename_compile() {
        let source = source_with(&[("docs/old.json", b"keep me")]);
        let mut tx = SourceTransaction::new(source.clone()).unwrap();
        tx.add("docs/new.json", b"fresh".to_vec()).unwrap();
        tx.rename("docs/old.json", "docs/renamed.json").unwrap();

        let compiled = tx.compile();
        assert_eq!(compiled.from_sha, source.tree().unwrap().sha());
        assert_eq!(compiled.changes.len(), 3);

        let tree = source.apply(&compiled.changes).unwrap();
        assert_eq!(tree.sha(), compiled.into_sha);
        assert!(tree.contains("docs/new.json"));
        assert!(tree.contains("docs/renamed.json"));
        assert!(!tree.contains("docs/old.json"));
    }

    #[test]
    fn rename_preserves_contents() {
        let source = source_with(&[("a.json", b"payload")]);
        let mut tx = SourceTransaction::new(source.clone()).unwrap();
        tx.rename("a.json", "b.json").unwrap();
        let tree = tx.commit().unwrap();
        let sha = tree.get("b.json").unwrap();
        assert_eq!(source.read(&sha).unwrap().unwrap(), b"payload");
    }

    #[test]
    fn staged_conflicts_fail_early() {
        let source = source_with(&[("a.json", b"x")]);
        let mut tx = SourceTransaction::new(source).unwrap();
        assert!(matches!(
            tx.add("a.json", b"y".to_vec()),
            Err(SourceError::PathExists(_))
        ));
        assert!(matches!(
            tx.remove("missing.json"),
            Err(SourceError::PathNotFound(_))
        ));
        assert!(matches!(
            tx.rename("missing.json", "b.json"),
            Err(SourceError::PathNotFound(_))
        ));
    }

    #[test]
    fn add_then_remove_roundtrips_working_set() {
        let source = source_with(&[]);
        let mut tx = SourceTransaction::new(source.clone()).unwrap();
        tx.add("tmp.json", b"temp".to_vec()).unwrap();
        tx.remove("tmp.json").unwrap();
        let compiled = tx.compile();
        // The working set is back to base, but both operations are recorded.
        assert_eq!(compiled.into_sha, compiled.from_sha);
        assert_eq!(compiled.changes.len(), 2);
    }

    #[test]
    fn empty_transaction_compiles_to_identity() {
        let source = source_with(&[("a.json", b"x")]);
        let tx = SourceTransaction::new(source).unwrap();
        assert!(tx.is_empty());
        let compiled = tx.compile();
        assert_eq!(compiled.from_sha, compiled.into_sha);
        assert!(compiled.changes.is_empty());
    }
}
