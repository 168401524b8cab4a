//! In-memory message group store

use crate::core::sync::{read_lock, write_lock};
use crate::message::{CorrelationKey, Message};
use crate::store::{
    ExpiryOutcome, KeyLockTable, MessageGroup, MessageGroupCallback, MessageGroupStore, StoreError,
    StoreResult,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Message group store backed by a `HashMap`
///
/// Optionally bounded by the total number of stored messages; adding beyond
/// the bound fails with [`StoreError::CapacityExceeded`] and leaves the store
/// unchanged.
pub struct SimpleMessageStore {
    groups: RwLock<HashMap<CorrelationKey, MessageGroup>>,
    callbacks: RwLock<Vec<Arc<dyn MessageGroupCallback>>>,
    locks: KeyLockTable,
    capacity: Option<usize>,
}

impl SimpleMessageStore {
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
            callbacks: RwLock::new(Vec::new()),
            locks: KeyLockTable::new(),
            capacity: None,
        }
    }

    /// Store holding at most `capacity` messages across all groups
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::new()
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Remove `group` only if its key is free and nothing was added since the
    /// snapshot was taken
    fn remove_if_unchanged(&self, group: &MessageGroup) -> StoreResult<bool> {
        let Some(mut guard) = self.locks.try_acquire(group.key()) else {
            return Ok(false);
        };
        let mut groups = write_lock(&self.groups, "message groups", sync_error)?;
        let unchanged = groups
            .get(group.key())
            .is_some_and(|current| current.last_modified() == group.last_modified());
        if unchanged {
            groups.remove(group.key());
        }
        if !groups.contains_key(group.key()) {
            guard.retire();
        }
        Ok(unchanged)
    }

    fn offer_to_callbacks(
        &self,
        group: MessageGroup,
        callbacks: &[Arc<dyn MessageGroupCallback>],
        detached: &mut Vec<Arc<dyn MessageGroupCallback>>,
    ) -> StoreResult<bool> {
        let mut expired = false;
        let mut attached = false;
        for callback in callbacks {
            match callback.on_expiry(group.clone()) {
                ExpiryOutcome::Expired => {
                    expired = true;
                    attached = true;
                }
                ExpiryOutcome::Skipped => attached = true,
                ExpiryOutcome::Detached => {
                    if !detached.iter().any(|known| same_callback(known, callback)) {
                        detached.push(Arc::clone(callback));
                    }
                }
            }
        }

        // Nobody is left to coordinate with, so expire the group directly
        if !attached {
            return self.remove_if_unchanged(&group);
        }
        Ok(expired)
    }

    fn prune_callbacks(&self, detached: &[Arc<dyn MessageGroupCallback>]) -> StoreResult<()> {
        if detached.is_empty() {
            return Ok(());
        }
        let mut callbacks = write_lock(&self.callbacks, "expiry callbacks", sync_error)?;
        callbacks.retain(|callback| !detached.iter().any(|gone| same_callback(gone, callback)));
        log::debug!("Unregistered {} detached expiry callback(s)", detached.len());
        Ok(())
    }
}

impl Default for SimpleMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageGroupStore for SimpleMessageStore {
    fn get_message_group(&self, key: &CorrelationKey) -> StoreResult<MessageGroup> {
        let groups = read_lock(&self.groups, "message groups", sync_error)?;
        Ok(groups
            .get(key)
            .cloned()
            .unwrap_or_else(|| MessageGroup::new(key.clone())))
    }

    fn add_message_to_group(
        &self,
        key: &CorrelationKey,
        message: Arc<Message>,
    ) -> StoreResult<MessageGroup> {
        let mut groups = write_lock(&self.groups, "message groups", sync_error)?;
        if let Some(capacity) = self.capacity {
            let stored: usize = groups.values().map(MessageGroup::size).sum();
            if stored >= capacity {
                return Err(StoreError::CapacityExceeded { capacity });
            }
        }

        let group = groups
            .entry(key.clone())
            .or_insert_with(|| MessageGroup::new(key.clone()));
        group.add(message);
        log::trace!("Group '{}' now holds {} message(s)", key, group.size());
        Ok(group.clone())
    }

    fn remove_message_group(&self, key: &CorrelationKey) -> StoreResult<Option<MessageGroup>> {
        let mut groups = write_lock(&self.groups, "message groups", sync_error)?;
        Ok(groups.remove(key))
    }

    fn message_group_count(&self) -> StoreResult<usize> {
        Ok(read_lock(&self.groups, "message groups", sync_error)?.len())
    }

    fn message_count(&self) -> StoreResult<usize> {
        let groups = read_lock(&self.groups, "message groups", sync_error)?;
        Ok(groups.values().map(MessageGroup::size).sum())
    }

    fn key_locks(&self) -> &KeyLockTable {
        &self.locks
    }

    fn register_expiry_callback(&self, callback: Arc<dyn MessageGroupCallback>) -> StoreResult<()> {
        write_lock(&self.callbacks, "expiry callbacks", sync_error)?.push(callback);
        Ok(())
    }

    fn expire_message_groups(&self, timeout: Duration) -> StoreResult<usize> {
        // Snapshot first: callbacks must run without the group lock held
        let stale: Vec<MessageGroup> = {
            let groups = read_lock(&self.groups, "message groups", sync_error)?;
            groups
                .values()
                .filter(|group| group.is_idle_for(timeout))
                .cloned()
                .collect()
        };
        if stale.is_empty() {
            return Ok(0);
        }

        let callbacks = read_lock(&self.callbacks, "expiry callbacks", sync_error)?.clone();
        let mut detached = Vec::new();
        let mut expired = 0;
        let candidates = stale.len();

        for group in stale {
            let key = group.key().clone();
            let removed = if callbacks.is_empty() {
                self.remove_if_unchanged(&group)?
            } else {
                self.offer_to_callbacks(group, &callbacks, &mut detached)?
            };
            if removed {
                expired += 1;
                log::debug!("Expired message group '{}'", key);
            } else {
                log::trace!("Message group '{}' not expired (busy or modified)", key);
            }
        }

        self.prune_callbacks(&detached)?;
        log::debug!(
            "Expiry pass (timeout {:?}): {} of {} stale group(s) expired",
            timeout,
            expired,
            candidates
        );
        Ok(expired)
    }
}

fn same_callback(a: &Arc<dyn MessageGroupCallback>, b: &Arc<dyn MessageGroupCallback>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn sync_error(message: String) -> StoreError {
    StoreError::Synchronisation { message }
}
