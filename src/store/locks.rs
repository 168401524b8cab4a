//! Per-key lock table
//!
//! Each correlation key that has a group accumulating or completing owns one
//! entry. Entries are created on first use and retired by whoever removes
//! the group, so the table never outgrows the set of live groups. The table
//! belongs to the store, so every handler sharing a store also shares its
//! key locks.

use crate::message::CorrelationKey;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Identifies the handler that started the group behind a key
pub type LockOwner = u64;

#[derive(Debug)]
struct KeyEntry {
    held: bool,
    owner: Option<LockOwner>,
}

/// Lock table keyed by correlation key
///
/// Waiters block on one shared condition variable; a waiter whose entry was
/// retired while it slept inserts a fresh one and proceeds. Each entry also
/// records the handler that created it, so expiry can leave other handlers'
/// groups alone.
#[derive(Debug, Default)]
pub struct KeyLockTable {
    entries: Mutex<HashMap<CorrelationKey, KeyEntry>>,
    released: Condvar,
}

impl KeyLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `key` is free, giving up after `timeout`
    ///
    /// A new entry is recorded as belonging to `owner`. Returns `None` only
    /// when the timeout elapsed with the key still held.
    pub fn acquire(
        &self,
        key: &CorrelationKey,
        owner: Option<LockOwner>,
        timeout: Option<Duration>,
    ) -> Option<KeyGuard<'_>> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut entries = self.entries.lock();
        loop {
            let entry = entries.entry(key.clone()).or_insert(KeyEntry {
                held: false,
                owner,
            });
            if !entry.held {
                entry.held = true;
                if entry.owner.is_none() {
                    entry.owner = owner;
                }
                return Some(KeyGuard::new(self, key.clone()));
            }

            match deadline {
                None => self.released.wait(&mut entries),
                Some(deadline) => {
                    let timed_out = self.released.wait_until(&mut entries, deadline).timed_out();
                    if timed_out && entries.get(key).is_some_and(|entry| entry.held) {
                        return None;
                    }
                }
            }
        }
    }

    /// Take `key` only if nobody holds it, whoever owns it
    pub fn try_acquire(&self, key: &CorrelationKey) -> Option<KeyGuard<'_>> {
        self.try_acquire_if(key, None, |_| true)
    }

    /// Take `key` only if nobody holds it and it is unowned or owned by `owner`
    pub fn try_acquire_owned(
        &self,
        key: &CorrelationKey,
        owner: LockOwner,
    ) -> Option<KeyGuard<'_>> {
        self.try_acquire_if(key, Some(owner), |entry| {
            !matches!(entry.owner, Some(current) if current != owner)
        })
    }

    fn try_acquire_if(
        &self,
        key: &CorrelationKey,
        owner: Option<LockOwner>,
        allowed: impl Fn(&KeyEntry) -> bool,
    ) -> Option<KeyGuard<'_>> {
        let mut entries = self.entries.lock();
        let entry = entries.entry(key.clone()).or_insert(KeyEntry {
            held: false,
            owner,
        });
        if entry.held || !allowed(entry) {
            return None;
        }
        entry.held = true;
        Some(KeyGuard::new(self, key.clone()))
    }

    /// Forget `owner` on every entry it created
    ///
    /// Called when a handler goes away so its groups can still be expired.
    pub fn disown(&self, owner: LockOwner) {
        let mut entries = self.entries.lock();
        for entry in entries.values_mut() {
            if entry.owner == Some(owner) {
                entry.owner = None;
            }
        }
    }

    /// Number of keys with an entry
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, key: &CorrelationKey, retire: bool) {
        let mut entries = self.entries.lock();
        if retire {
            entries.remove(key);
        } else if let Some(entry) = entries.get_mut(key) {
            entry.held = false;
        }
        drop(entries);
        self.released.notify_all();
    }
}

/// Exclusive hold on one key, released on drop
pub struct KeyGuard<'a> {
    table: &'a KeyLockTable,
    key: CorrelationKey,
    retire: bool,
}

impl<'a> KeyGuard<'a> {
    fn new(table: &'a KeyLockTable, key: CorrelationKey) -> Self {
        Self {
            table,
            key,
            retire: false,
        }
    }

    pub fn key(&self) -> &CorrelationKey {
        &self.key
    }

    /// Drop the table entry on release instead of keeping it for the next message
    pub fn retire(&mut self) {
        self.retire = true;
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.table.release(&self.key, self.retire);
    }
}
