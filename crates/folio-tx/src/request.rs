//! Compiled commit requests.
//!
//! A transaction compiles into a self-contained [`CommitRequest`]: the base
//! and target tree shas, the file-level changes, and a list of per-file
//! `checks` the applying side must verify before writing. The checks carry
//! the base state of every touched path, so a request detects concurrent
//! modification of exactly the files it touches without rejecting unrelated
//! writes.

use serde::{Deserialize, Serialize};

use folio_source::{Change, Source, Tree};
use folio_types::Sha;

use crate::error::{TxError, TxResult};

/// One file-level change in a commit request.
///
/// Entry content and binary assets travel as distinct operations so the
/// applying side can route them differently; against a plain [`Source`]
/// both pairs behave the same.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum CommitChange {
    AddContent {
        path: String,
        sha: Sha,
        contents: Vec<u8>,
    },
    DeleteContent {
        path: String,
        sha: Sha,
    },
    UploadFile {
        path: String,
        sha: Sha,
        contents: Vec<u8>,
    },
    RemoveFile {
        path: String,
        sha: Sha,
    },
}

impl CommitChange {
    pub fn path(&self) -> &str {
        match self {
            Self::AddContent { path, .. }
            | Self::DeleteContent { path, .. }
            | Self::UploadFile { path, .. }
            | Self::RemoveFile { path, .. } => path,
        }
    }

    fn to_change(&self) -> Change {
        match self {
            Self::AddContent {
                path,
                sha,
                contents,
            }
            | Self::UploadFile {
                path,
                sha,
                contents,
            } => Change::Add {
                path: path.clone(),
                sha: *sha,
                contents: contents.clone(),
            },
            Self::DeleteContent { path, sha } | Self::RemoveFile { path, sha } => {
                Change::delete(path.clone(), *sha)
            }
        }
    }
}

/// A verifiable batch of file changes against a known base tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub from_sha: Sha,
    pub into_sha: Sha,
    pub description: String,
    /// Base state of every touched path. A null sha asserts absence.
    pub checks: Vec<(String, Sha)>,
    pub changes: Vec<CommitChange>,
}

impl CommitRequest {
    /// Verify every per-file check against a tree.
    pub fn verify(&self, tree: &Tree) -> TxResult<()> {
        for (path, expected) in &self.checks {
            let actual = tree.get(path).unwrap_or_else(Sha::null);
            if actual != *expected {
                return Err(TxError::CheckFailed {
                    path: path.clone(),
                    expected: *expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Verify against the source's current tree, then apply all changes.
    pub fn apply(&self, source: &dyn Source) -> TxResult<Tree> {
        self.verify(&source.tree()?)?;
        let changes: Vec<Change> = self.changes.iter().map(CommitChange::to_change).collect();
        Ok(source.apply(&changes)?)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
