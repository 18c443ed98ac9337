use crate::sha::Sha;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g. `"folio-file-v1"`) that is
/// prepended to every hash computation. This prevents cross-type hash
/// collisions: a file and a tree with identical bytes produce different
/// hashes.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for entry file contents.
    pub const FILE: Self = Self {
        domain: "folio-file-v1",
    };
    /// Hasher for tree listings.
    pub const TREE: Self = Self {
        domain: "folio-tree-v1",
    };
    /// Hasher for parsed entry rows (meta + data, independent of encoding).
    pub const ROW: Self = Self {
        domain: "folio-row-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Sha {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Sha::from_hash(*hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected sha.
    pub fn verify(&self, data: &[u8], expected: &Sha) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
