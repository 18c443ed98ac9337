//! Tree-level diff: compare two trees and produce a change list.
//!
//! A modified file becomes a `Delete` of the old content plus an `Add` of
//! the new content at the same path, matching how the index consumes
//! changes.

use crate::change::Change;
use crate::error::{SourceError, SourceResult};
use crate::source::Source;
use crate::tree::Tree;

/// Compare two trees, reading added contents from `source`.
///
/// Returns an empty list when the trees are identical. Deletes are emitted
/// before adds so a path replacement reads as delete-then-add.
pub fn diff_trees(old: &Tree, new: &Tree, source: &dyn Source) -> SourceResult<Vec<Change>> {
    if old.sha() == new.sha() {
        return Ok(Vec::new());
    }

    let mut deletes = Vec::new();
    let mut adds = Vec::new();

    for (path, old_sha) in old.files() {
        match new.get(path) {
            Some(new_sha) if new_sha == old_sha => {}
            _ => deletes.push(Change::delete(path, old_sha)),
        }
    }

    for (path, new_sha) in new.files() {
        if old.get(path) == Some(new_sha) {
            continue;
        }
        let contents = source
            .read(&new_sha)?
            .ok_or(SourceError::BlobNotFound(new_sha))?;
        adds.push(Change::Add {
            path: path.to_string(),
            sha: new_sha,
            contents,
        });
    }

    deletes.extend(adds);
    Ok(deletes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySource;

    #[test]
    fn identical_trees_diff_empty() {
        let source = InMemorySource::with_files([("a.json", b"x".to_vec())]).unwrap();
        let tree = source.tree().unwrap();
        assert!(diff_trees(&tree, &tree, &source).unwrap().is_empty());
    }

    #[test]
    fn addition_only() {
        let source = InMemorySource::new();
        let old = source.tree().unwrap();
        let new = source
            .apply(&[Change::add("a.json", b"x".to_vec())])
            .unwrap();

        let changes = diff_trees(&old, &new, &source).unwrap();
        assert_eq!(changes.len(), 1);
        assert!(matches!(&changes[0], Change::Add { path, contents, .. }
            if path == "a.json" && contents == b"x"));
    }

    #[test]
    fn deletion_only() {
        let source = InMemorySource::with_files([("a.json", b"x".to_vec())]).unwrap();
        let old = source.tree().unwrap();
        let sha = old.get("a.json").unwrap();
        let new = source.apply(&[Change::delete("a.json", sha)]).unwrap();

        let changes = diff_trees(&old, &new, &source).unwrap();
        assert_eq!(changes, vec![Change::delete("a.json", sha)]);
    }

    #[test]
    fn modification_is_delete_then_add() {
        let source = InMemorySource::with_files([("a.json", b"old".to_vec())]).unwrap();
        let old = source.tree().unwrap();
        let old_sha = old.get("a.json").unwrap();
        let new = source
            .apply(&[
                Change::delete("a.json", old_sha),
                Change::add("a.json", b"new".to_vec()),
            ])
            .unwrap();

        let changes = diff_trees(&old, &new, &source).unwrap();
        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], Change::Delete { .. }));
        assert!(matches!(&changes[1], Change::Add { contents, .. } if contents == b"new"));
    }

    #[test]
    fn reverse_diff_swaps_operations() {
        let source = InMemorySource::new();
        let old = source.tree().unwrap();
        let new = source
            .apply(&[Change::add("a.json", b"x".to_vec())])
            .unwrap();

        let forward = diff_trees(&old, &new, &source).unwrap();
        let backward = diff_trees(&new, &old, &source).unwrap();
        assert!(matches!(&forward[0], Change::Add { .. }));
        assert!(matches!(&backward[0], Change::Delete { .. }));
    }
}
