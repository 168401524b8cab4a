//! Message Group Store
//!
//! Groups of correlated messages live in a [`MessageGroupStore`], keyed by
//! correlation key. The store is the only shared mutable state of the
//! correlation engine; the handler re-fetches groups through their key
//! instead of keeping private copies.
//!
//! Idle groups are pruned by [`MessageGroupStore::expire_message_groups`],
//! either on an operator schedule or by a [`MessageGroupStoreReaper`]. Stale
//! groups are offered to registered [`MessageGroupCallback`]s, which is how
//! the correlating handler keeps expiry away from a group it is completing.
//! The per-key locks live in the store's [`KeyLockTable`], so handlers that
//! share a store also share their locks.

mod error;
mod group;
mod locks;
mod reaper;
mod simple;
mod traits;

pub use error::{StoreError, StoreResult};
pub use group::MessageGroup;
pub use locks::{KeyGuard, KeyLockTable, LockOwner};
pub use reaper::{MessageGroupStoreReaper, ReaperHandle, DEFAULT_REAPER_INTERVAL};
pub use simple::SimpleMessageStore;
pub use traits::{ExpiryOutcome, MessageGroupCallback, MessageGroupStore};

#[cfg(test)]
mod tests;
