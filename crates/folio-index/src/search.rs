//! Full-text search over entry titles and searchable field text.
//!
//! A deliberately small in-memory index: every document keeps its token
//! lists, and a query scans all documents. Title hits are boosted, the last
//! query term matches by prefix (search-as-you-type), and longer terms
//! tolerate one edit of fuzz.

use std::collections::HashMap;

use folio_types::tokenize;

const TITLE_BOOST: f64 = 2.0;
const PREFIX_SCORE: f64 = 0.7;
const FUZZY_SCORE: f64 = 0.5;
/// Minimum term length before fuzzy matching applies.
const FUZZY_MIN_LEN: usize = 5;

#[derive(Clone, Debug)]
struct Document {
    title: Vec<String>,
    body: Vec<String>,
}

/// In-memory search index keyed by entry file path.
#[derive(Clone, Debug, Default)]
pub struct SearchIndex {
    docs: HashMap<String, Document>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index or replace one document.
    pub fn insert(&mut self, file_path: &str, title: &str, body: &str) {
        self.docs.insert(
            file_path.to_string(),
            Document {
                title: tokenize(title),
                body: tokenize(body),
            },
        );
    }

    /// Drop one document.
    pub fn remove(&mut self, file_path: &str) {
        self.docs.remove(file_path);
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Returns `true` if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Score all documents against a query, best first.
    ///
    /// Every query term must match somewhere in a document for it to rank at
    /// all; the score is the sum of per-term match quality.
    pub fn search(&self, query: &str) -> Vec<(String, f64)> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return Vec::new();
        }
        let last = terms.len() - 1;

        let mut hits: Vec<(String, f64)> = Vec::new();
        for (path, doc) in &self.docs {
            let mut total = 0.0;
            let mut matched_all = true;
            for (i, term) in terms.iter().enumerate() {
                let prefix_ok = i == last;
                let title = best_match(term, &doc.title, prefix_ok) * TITLE_BOOST;
                let body = best_match(term, &doc.body, prefix_ok);
                let best = title.max(body);
                if best == 0.0 {
                    matched_all = false;
                    break;
                }
                total += best;
            }
            if matched_all {
                hits.push((path.clone(), total));
            }
        }
        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        hits
    }
}

fn best_match(term: &str, tokens: &[String], allow_prefix: bool) -> f64 {
    let mut best: f64 = 0.0;
    for token in tokens {
        if token == term {
            return 1.0;
        }
        if allow_prefix && token.starts_with(term) {
            best = best.max(PREFIX_SCORE);
        }
        if term.chars().count() >= FUZZY_MIN_LEN && within_one_edit(term, token) {
            best = best.max(FUZZY_SCORE);
        }
    }
    best
}

/// Bounded edit distance: `true` when `a` and `b` are at most one
/// insertion, deletion, or substitution apart.
fn within_one_edit(a: &str, b: &str) -> bool {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    match long.len() - short.len() {
        0 => {
            let diffs = short.iter().zip(long.iter()).filter(|(x, y)| x != y).count();
            diffs <= 1
        }
        1 => {
            // One insertion: skip the first mismatch in the longer string.
            let mut i = 0;
            let mut j = 0;
            let mut skipped = false;
            while i < short.len() {
                if short[i] == long[j] {
                    i += 1;
                    j += 1;
                } else if skipped {
                    return false;
                } else {
                    skipped = true;
                    j += 1;
                }
            }
            true
        }
        _ => false,
    }
}
