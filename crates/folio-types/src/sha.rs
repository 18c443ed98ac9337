use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Content-addressed identifier for file and tree content.
///
/// A `Sha` is the BLAKE3 hash of the content it names (domain-separated by
/// object kind, see [`crate::hasher::ContentHasher`]). Identical content
/// always produces the same `Sha`, which is what makes tree diffs and
/// per-file conflict checks cheap: comparing two hashes answers "did this
/// change" without reading the bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sha([u8; 32]);

impl Sha {
    /// Create a `Sha` from a pre-computed hash.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The null sha (all zeros). Represents "no content".
    pub const fn null() -> Self {
        Self([0u8; 32])
    }

    /// Returns `true` if this is the null sha.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha({})", self.short_hex())
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for Sha {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<Sha> for [u8; 32] {
    fn from(sha: Sha) -> Self {
        sha.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::ContentHasher;

    #[test]
    fn hashing_is_deterministic() {
        let id1 = ContentHasher::FILE.hash(b"hello world");
        let id2 = ContentHasher::FILE.hash(b"hello world");
        assert_eq!(id1, id2);
    }

    #[test]
    fn different_data_produces_different_shas() {
        let id1 = ContentHasher::FILE.hash(b"hello");
        let id2 = ContentHasher::FILE.hash(b"world");
        assert_ne!(id1, id2);
    }

    #[test]
    fn null_is_all_zeros() {
        let null = Sha::null();
        assert!(null.is_null());
        assert_eq!(null.as_bytes(), &[0u8; 32]);
    }

    #[test]
    fn hex_roundtrip() {
        let sha = ContentHasher::FILE.hash(b"test");
        let hex = sha.to_hex();
        let parsed = Sha::from_hex(&hex).unwrap();
        assert_eq!(sha, parsed);
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        let err = Sha::from_hex("abcd").unwrap_err();
        assert!(matches!(err, TypeError::InvalidLength { .. }));
    }

    #[test]
    fn short_hex_is_8_chars() {
        let sha = ContentHasher::FILE.hash(b"test");
        assert_eq!(sha.short_hex().len(), 8);
    }

    #[test]
    fn display_is_full_hex() {
        let sha = ContentHasher::FILE.hash(b"test");
        let display = format!("{sha}");
        assert_eq!(display.len(), 64);
        assert_eq!(display, sha.to_hex());
    }

    #[test]
    fn serde_roundtrip() {
        let sha = ContentHasher::FILE.hash(b"serde test");
        let json = serde_json::to_string(&sha).unwrap();
        let parsed: Sha = serde_json::from_str(&json).unwrap();
        assert_eq!(sha, parsed);
    }
}
