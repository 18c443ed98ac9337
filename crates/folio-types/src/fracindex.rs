//! Fractional ordering keys.
//!
//! A [`FracKey`] is a string over the digits `a`..`z` that sorts
//! lexicographically. Between any two distinct keys another key can be
//! generated without renumbering siblings, which is what keeps reordering a
//! single-file operation. Keys never end in the minimum digit `a`, so every
//! key has room below it for further insertions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

const BASE: u8 = 26;

/// Fractional ordering key for sibling placement.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FracKey(String);

impl FracKey {
    /// Validate and wrap an existing key.
    pub fn parse(s: impl Into<String>) -> TypeResult<Self> {
        let s = s.into();
        if s.is_empty() {
            return Err(TypeError::InvalidKey {
                key: s,
                reason: "empty".to_string(),
            });
        }
        if !s.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(TypeError::InvalidKey {
                key: s,
                reason: "digits must be a..z".to_string(),
            });
        }
        if s.ends_with('a') {
            return Err(TypeError::InvalidKey {
                key: s,
                reason: "must not end in the minimum digit".to_string(),
            });
        }
        Ok(Self(s))
    }

    /// The key used for the first entry under a fresh parent.
    pub fn initial() -> Self {
        Self::between(None, None).unwrap_or_else(|_| Self("n".to_string()))
    }

    /// Generate a key strictly between `lower` and `upper`.
    ///
    /// `None` bounds are open: `between(None, None)` yields the midpoint of
    /// the whole key space, `between(Some(k), None)` a key after `k`, and
    /// `between(None, Some(k))` a key before `k`.
    pub fn between(lower: Option<&FracKey>, upper: Option<&FracKey>) -> TypeResult<Self> {
        if let (Some(lo), Some(hi)) = (lower, upper) {
            if lo.0 >= hi.0 {
                return Err(TypeError::KeyBoundsNotIncreasing {
                    lower: lo.0.clone(),
                    upper: hi.0.clone(),
                });
            }
        }
        let a: Vec<u8> = lower.map(|k| k.digits()).unwrap_or_default();
        let b: Option<Vec<u8>> = upper.map(|k| k.digits());
        let mid = midpoint(&a, b.as_deref());
        Ok(Self(mid.into_iter().map(digit_to_char).collect()))
    }

    /// Generate `n` distinct keys strictly between `lower` and `upper`,
    /// in ascending order.
    ///
    /// This is the conflict-repair primitive: when a sibling set has drifted
    /// into duplicate keys, the whole set is re-keyed in one pass instead of
    /// wedging a single key between corrupt neighbors. Balanced binary
    /// subdivision keeps the generated keys short.
    pub fn spread(lower: Option<&FracKey>, upper: Option<&FracKey>, n: usize) -> TypeResult<Vec<Self>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let mid = Self::between(lower, upper)?;
        let left = n / 2;
        let mut out = Self::spread(lower, Some(&mid), left)?;
        let right = Self::spread(Some(&mid), upper, n - 1 - left)?;
        out.push(mid);
        out.extend(right);
        Ok(out)
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn digits(&self) -> Vec<u8> {
        self.0.bytes().map(|b| b - b'a').collect()
    }
}

impl fmt::Debug for FracKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FracKey({})", self.0)
    }
}

impl fmt::Display for FracKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn digit_to_char(d: u8) -> char {
    (b'a' + d) as char
}

/// Midpoint of the open interval `(a, b)` in digit space.
///
/// `a` may be empty (negative infinity); `b == None` is positive infinity.
/// Requires `a < b` and that neither bound ends in digit 0, which
/// [`FracKey`] validation guarantees.
fn midpoint(a: &[u8], b: Option<&[u8]>) -> Vec<u8> {
    if let Some(b) = b {
        // Skip the shared prefix; a missing digit in `a` reads as 0.
        let mut i = 0;
        while i < b.len() && a.get(i).copied().unwrap_or(0) == b[i] {
            i += 1;
        }
        debug_assert!(i < b.len(), "bounds must be strictly ordered");
        if i > 0 {
            let mut out = b[..i].to_vec();
            let a_rest = if i <= a.len() { &a[i..] } else { &[] };
            out.extend(midpoint(a_rest, Some(&b[i..])));
            return out;
        }
    }
    let da = a.first().copied().unwrap_or(0);
    let db = b.map_or(BASE, |b| b[0]);
    if db - da > 1 {
        // Room for a whole digit between the two.
        return vec![(da + db) / 2];
    }
    // Consecutive leading digits: descend into the suffix. Everything that
    // starts with `da` sorts below `b`, so the upper bound opens up.
    let mut out = vec![da];
    if a.len() > 1 {
        out.extend(midpoint(&a[1..], None));
    } else {
        let b_rest = b.filter(|b| b.len() > 1).map(|b| &b[1..]);
        out.extend(midpoint(&[], b_rest));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(s: &str) -> FracKey {
        FracKey::parse(s).unwrap()
    }

    #[test]
    fn initial_is_midpoint() {
        assert_eq!(FracKey::initial().as_str(), "n");
    }

    #[test]
    fn parse_rejects_invalid_keys() {
        assert!(FracKey::parse("").is_err());
        assert!(FracKey::parse("na").is_err());
        assert!(FracKey::parse("N").is_err());
        assert!(FracKey::parse("n1").is_err());
    }

    #[test]
    fn between_open_bounds() {
        let k = key("n");
        let after = FracKey::between(Some(&k), None).unwrap();
        assert!(after > k);
        let before = FracKey::between(None, Some(&k)).unwrap();
        assert!(before < k);
    }

    #[test]
    fn between_adjacent_digits() {
        let m = FracKey::between(Some(&key("b")), Some(&key("c"))).unwrap();
        assert!(key("b") < m && m < key("c"));
    }

    #[test]
    fn between_prefix_bound() {
        let m = FracKey::between(Some(&key("f")), Some(&key("fb"))).unwrap();
        assert!(key("f") < m && m < key("fb"));
    }

    #[test]
    fn between_rejects_unordered_bounds() {
        let err = FracKey::between(Some(&key("t")), Some(&key("c"))).unwrap_err();
        assert!(matches!(err, TypeError::KeyBoundsNotIncreasing { .. }));
        assert!(FracKey::between(Some(&key("n")), Some(&key("n"))).is_err());
    }

    #[test]
    fn repeated_inserts_below_stay_ordered() {
        let mut upper = key("n");
        for _ in 0..64 {
            let k = FracKey::between(None, Some(&upper)).unwrap();
            assert!(k < upper);
            upper = k;
        }
    }

    #[test]
    fn repeated_inserts_above_stay_ordered() {
        let mut lower = key("n");
        for _ in 0..64 {
            let k = FracKey::between(Some(&lower), None).unwrap();
            assert!(k > lower);
            lower = k;
        }
    }

    #[test]
    fn spread_yields_distinct_sorted_keys() {
        let keys = FracKey::spread(None, None, 7).unwrap();
        assert_eq!(keys.len(), 7);
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn spread_respects_bounds() {
        let lo = key("c");
        let hi = key("d");
        let keys = FracKey::spread(Some(&lo), Some(&hi), 5).unwrap();
        assert_eq!(keys.len(), 5);
        assert!(keys.iter().all(|k| *k > lo && *k < hi));
    }

    #[test]
    fn spread_zero_is_empty() {
        assert!(FracKey::spread(None, None, 0).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn between_is_strictly_inside(
            a in "[a-z]{0,4}[b-z]",
            b in "[a-z]{0,4}[b-z]",
        ) {
            let (lo, hi) = if a < b { (a, b) } else if b < a { (b, a) } else { return Ok(()) };
            let lo = FracKey::parse(lo).unwrap();
            let hi = FracKey::parse(hi).unwrap();
            let mid = FracKey::between(Some(&lo), Some(&hi)).unwrap();
            prop_assert!(lo < mid, "{lo} < {mid}");
            prop_assert!(mid < hi, "{mid} < {hi}");
        }

        #[test]
        fn generated_keys_stay_valid(a in "[a-z]{0,4}[b-z]") {
            let lo = FracKey::parse(a).unwrap();
            let mid = FracKey::between(Some(&lo), None).unwrap();
            prop_assert!(FracKey::parse(mid.as_str()).is_ok());
        }
    }
}
