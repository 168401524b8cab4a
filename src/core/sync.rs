//! Poison-aware lock acquisition
//!
//! A std lock becomes poisoned when a thread panics while holding it. Rather
//! than unwrapping, callers convert the poison into their own module error so
//! the failure reaches the caller of the operation.

use std::sync::{LockResult, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

fn poison_message(kind: &str, what: &str) -> String {
    format!(
        "Internal synchronisation error ({kind} poisoned while guarding {what}). \
         A thread panicked while holding the lock."
    )
}

fn recover<G, E>(
    result: LockResult<G>,
    kind: &str,
    what: &str,
    error: impl FnOnce(String) -> E,
) -> Result<G, E> {
    result.map_err(|_| error(poison_message(kind, what)))
}

/// Acquire a mutex, mapping poisoning through `error`
pub fn lock_mutex<'a, T, E>(
    mutex: &'a Mutex<T>,
    what: &str,
    error: impl FnOnce(String) -> E,
) -> Result<MutexGuard<'a, T>, E> {
    recover(mutex.lock(), "mutex", what, error)
}

/// Acquire a read guard, mapping poisoning through `error`
pub fn read_lock<'a, T, E>(
    lock: &'a RwLock<T>,
    what: &str,
    error: impl FnOnce(String) -> E,
) -> Result<RwLockReadGuard<'a, T>, E> {
    recover(lock.read(), "RwLock", what, error)
}

/// Acquire a write guard, mapping poisoning through `error`
pub fn write_lock<'a, T, E>(
    lock: &'a RwLock<T>,
    what: &str,
    error: impl FnOnce(String) -> E,
) -> Result<RwLockWriteGuard<'a, T>, E> {
    recover(lock.write(), "RwLock", what, error)
}
