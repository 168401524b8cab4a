//! Store abstractions

use crate::message::{CorrelationKey, Message};
use crate::store::{KeyLockTable, MessageGroup, StoreResult};
use std::sync::Arc;
use std::time::Duration;

/// Repository of message groups keyed by correlation key
///
/// The store owns every group. Readers receive snapshots; all mutation goes
/// through the key, so a caller never works on a private copy that a
/// concurrent expiry could invalidate.
pub trait MessageGroupStore: Send + Sync {
    /// Current group for `key`, or an empty placeholder
    fn get_message_group(&self, key: &CorrelationKey) -> StoreResult<MessageGroup>;

    /// Append `message` to the group for `key`, creating the group if needed
    ///
    /// No de-duplication happens here; the same message added twice is stored
    /// twice. Returns the updated group.
    fn add_message_to_group(
        &self,
        key: &CorrelationKey,
        message: Arc<Message>,
    ) -> StoreResult<MessageGroup>;

    /// Delete the group and all its messages, returning what was removed
    fn remove_message_group(&self, key: &CorrelationKey) -> StoreResult<Option<MessageGroup>>;

    fn message_group_count(&self) -> StoreResult<usize>;

    /// Total number of messages across all groups
    fn message_count(&self) -> StoreResult<usize>;

    /// Per-key locks shared by everyone working on this store's groups
    fn key_locks(&self) -> &KeyLockTable;

    /// Register a participant in [`MessageGroupStore::expire_message_groups`]
    fn register_expiry_callback(&self, callback: Arc<dyn MessageGroupCallback>) -> StoreResult<()>;

    /// Expire every group idle for at least `timeout`
    ///
    /// Stale groups are offered to the registered callbacks, which decide
    /// whether the group can be expired right now. With no callbacks the store
    /// removes stale groups itself, skipping keys whose lock is held. Returns
    /// the number of groups expired.
    fn expire_message_groups(&self, timeout: Duration) -> StoreResult<usize>;
}

/// What an expiry callback did with a stale group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryOutcome {
    /// The group was completed or discarded and removed from the store
    Expired,
    /// The group is busy or changed since it was selected; try again later
    Skipped,
    /// The callback's owner no longer exists; it should be unregistered
    Detached,
}

/// Participant in group expiry
///
/// Callbacks run without any store lock held, so they may call back into the
/// store.
pub trait MessageGroupCallback: Send + Sync {
    fn on_expiry(&self, group: MessageGroup) -> ExpiryOutcome;
}
