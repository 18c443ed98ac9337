//! Access control seam for entry mutations.

use std::fmt;

use folio_types::EntryId;

use crate::error::{TxError, TxResult};

/// One mutation capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Permission {
    Create,
    Update,
    Publish,
    Archive,
    Move,
    Reorder,
    Delete,
    Upload,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Publish => "publish",
            Self::Archive => "archive",
            Self::Move => "move",
            Self::Reorder => "reorder",
            Self::Delete => "delete",
            Self::Upload => "upload",
        };
        f.write_str(name)
    }
}

/// Decides whether a mutation may proceed.
///
/// Checked before any change is staged, so a denial leaves the transaction
/// untouched.
pub trait Policy: Send + Sync {
    fn check(&self, permission: Permission, subject: Option<&EntryId>) -> TxResult<()>;
}

/// A policy that permits everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl Policy for AllowAll {
    fn check(&self, _permission: Permission, _subject: Option<&EntryId>) -> TxResult<()> {
        Ok(())
    }
}

/// A policy that denies one specific permission and permits the rest.
#[derive(Clone, Copy, Debug)]
pub struct Deny(pub Permission);

impl Policy for Deny {
    fn check(&self, permission: Permission, subject: Option<&EntryId>) -> TxResult<()> {
        if permission == self.0 {
            return Err(TxError::PermissionDenied {
                permission,
                subject: subject.cloned(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_all_permits_everything() {
        assert!(AllowAll.check(Permission::Delete, None).is_ok());
    }

    #[test]
    fn deny_rejects_only_its_permission() {
        let policy = Deny(Permission::Publish);
        assert!(policy.check(Permission::Create, None).is_ok());
        let err = policy.check(Permission::Publish, None).unwrap_err();
        assert!(matches!(
            err,
            TxError::PermissionDenied {
                permission: Permission::Publish,
                ..
            }
        ));
    }
}
