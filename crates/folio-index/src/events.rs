//! Index change notification.
//!
//! Every successful reindex emits one [`IndexEvent::Entry`] per affected id
//! followed by one [`IndexEvent::Index`] carrying the new tree sha.
//! Subscribers that fall behind lose the oldest events (broadcast
//! semantics); a lagging consumer should resync from the index snapshot.

use folio_types::{EntryId, Sha};
use tokio::sync::broadcast;

/// One index change notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexEvent {
    /// The index moved to a new tree.
    Index(Sha),
    /// The given entry's variants or derived state changed.
    Entry(EntryId),
}

/// A receiver of index events.
pub type EventStream = broadcast::Receiver<IndexEvent>;

pub(crate) fn channel(capacity: usize) -> broadcast::Sender<IndexEvent> {
    broadcast::channel(capacity).0
}
