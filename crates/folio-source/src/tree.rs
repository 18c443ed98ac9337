use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use folio_types::{ContentHasher, Sha};

/// A flat, content-addressed file tree.
///
/// Maps file path to content sha. The tree's own sha is the hash of the
/// sorted listing, so any change to any file changes the tree sha. Directory
/// structure is implied by `/` separators in paths; there are no explicit
/// directory objects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    sha: Sha,
    files: BTreeMap<String, Sha>,
}

impl Tree {
    /// Build a tree from a file listing, computing its sha.
    pub fn from_files(files: BTreeMap<String, Sha>) -> Self {
        let sha = hash_listing(&files);
        Self { sha, files }
    }

    /// The empty tree.
    pub fn empty() -> Self {
        Self::from_files(BTreeMap::new())
    }

    /// The content hash identifying this tree.
    pub fn sha(&self) -> Sha {
        self.sha
    }

    /// Content sha of one file.
    pub fn get(&self, path: &str) -> Option<Sha> {
        self.files.get(path).copied()
    }

    /// Returns `true` if the tree contains the exact path.
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// All files in path order.
    pub fn files(&self) -> impl Iterator<Item = (&str, Sha)> {
        self.files.iter().map(|(p, s)| (p.as_str(), *s))
    }

    /// Files whose path starts with the given directory prefix.
    ///
    /// The prefix is treated as a directory: `"docs"` matches `docs/a.json`
    /// but not `docs.json`.
    pub fn files_under<'a>(&'a self, dir: &'a str) -> impl Iterator<Item = (&'a str, Sha)> {
        self.files.iter().filter_map(move |(p, s)| {
            let rest = p.strip_prefix(dir)?;
            rest.strip_prefix('/').map(|_| (p.as_str(), *s))
        })
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if the tree has no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The underlying listing, for rebuilding a modified tree.
    pub fn to_files(&self) -> BTreeMap<String, Sha> {
        self.files.clone()
    }
}

fn hash_listing(files: &BTreeMap<String, Sha>) -> Sha {
    // BTreeMap iteration is sorted, so the serialization is canonical.
    let listing: Vec<(&str, String)> = files
        .iter()
        .map(|(p, s)| (p.as_str(), s.to_hex()))
        .collect();
    let bytes = serde_json::to_vec(&listing).unwrap_or_default();
    ContentHasher::TREE.hash(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sha(b: u8) -> Sha {
        Sha::from_hash([b; 32])
    }

    fn tree(files: &[(&str, u8)]) -> Tree {
        Tree::from_files(
            files
                .iter()
                .map(|(p, b)| (p.to_string(), sha(*b)))
                .collect(),
        )
    }

    #[test]
    fn empty_tree() {
        let t = Tree::empty();
        assert!(t.is_empty());
        assert_eq!(t.len(), 0);
        assert!(!t.sha().is_null());
    }

    #[test]
    fn sha_is_content_derived() {
        let a = tree(&[("pages/home.json", 1)]);
        let b = tree(&[("pages/home.json", 1)]);
        let c = tree(&[("pages/home.json", 2)]);
        assert_eq!(a.sha(), b.sha());
        assert_ne!(a.sha(), c.sha());
        assert_ne!(a.sha(), Tree::empty().sha());
    }

    #[test]
    fn lookup() {
        let t = tree(&[("pages/home.json", 1), ("pages/about.json", 2)]);
        assert_eq!(t.get("pages/home.json"), Some(sha(1)));
        assert_eq!(t.get("missing.json"), None);
        assert!(t.contains("pages/about.json"));
    }

    #[test]
    fn files_under_treats_prefix_as_directory() {
        let t = tree(&[
            ("docs/a.json", 1),
            ("docs/guides/b.json", 2),
            ("docs.json", 3),
            ("data/c.json", 4),
        ]);
        let under: Vec<&str> = t.files_under("docs").map(|(p, _)| p).collect();
        assert_eq!(under, vec!["docs/a.json", "docs/guides/b.json"]);
    }
}
