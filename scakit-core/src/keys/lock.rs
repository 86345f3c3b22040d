//! Per-alias locking for key store mutations.
//!
//! Replacing or deleting a key pair must not interleave with another
//! mutation of the same alias. Each alias gets its own mutex so different
//! connections proceed in parallel. Entries are dropped again once an alias
//! is deleted and nobody waits on it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, TryLockError};

use crate::error::ScaResult;
use crate::keystore::KeyStoreError;

/// In-process lock table keyed by alias.
#[derive(Default)]
pub struct AliasLockManager {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl AliasLockManager {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn get_lock(&self, alias: &str) -> ScaResult<Arc<Mutex<()>>> {
        {
            let locks = self.locks.read().map_err(poisoned)?;
            if let Some(lock) = locks.get(alias) {
                return Ok(Arc::clone(lock));
            }
        }
        let mut locks = self.locks.write().map_err(poisoned)?;
        Ok(Arc::clone(
            locks
                .entry(alias.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        ))
    }

    /// Runs `f` while holding the lock for `alias`.
    ///
    /// # Errors
    ///
    /// Returns a lock error if the table or the alias mutex is poisoned,
    /// otherwise whatever `f` returns.
    pub fn with_alias_lock<R, F>(&self, alias: &str, f: F) -> ScaResult<R>
    where
        F: FnOnce() -> ScaResult<R>,
    {
        let lock = self.get_lock(alias)?;
        let _guard = lock.lock().map_err(poisoned)?;
        f()
    }

    /// Runs `f` only if the lock for `alias` is free. Returns `Ok(None)` when busy.
    ///
    /// # Errors
    ///
    /// Returns a lock error if a mutex is poisoned, otherwise whatever `f` returns.
    pub fn try_with_alias_lock<R, F>(&self, alias: &str, f: F) -> ScaResult<Option<R>>
    where
        F: FnOnce() -> ScaResult<R>,
    {
        let lock = self.get_lock(alias)?;
        let _guard = match lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Ok(None),
            Err(TryLockError::Poisoned(e)) => return Err(poisoned(e)),
        };
        f().map(Some)
    }

    /// Drops the table entry for `alias` unless another caller still holds
    /// or waits on its mutex.
    ///
    /// # Errors
    ///
    /// Returns a lock error if the table is poisoned.
    pub fn release(&self, alias: &str) -> ScaResult<()> {
        let mut locks = self.locks.write().map_err(poisoned)?;
        if locks
            .get(alias)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(alias);
        }
        Ok(())
    }

    /// Number of aliases currently in the lock table.
    ///
    /// # Errors
    ///
    /// Returns a lock error if the table is poisoned.
    pub fn alias_count(&self) -> ScaResult<usize> {
        Ok(self.locks.read().map_err(poisoned)?.len())
    }
}

fn poisoned<E: std::fmt::Display>(err: E) -> crate::error::ScaError {
    KeyStoreError::Lock(format!("alias lock poisoned: {err}")).into()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_with_alias_lock_returns_result() {
        let locks = AliasLockManager::new();
        let value = locks.with_alias_lock("a", || Ok(7)).unwrap();
        assert_eq!(value, 7);
        assert_eq!(locks.alias_count().unwrap(), 1);
    }

    #[test]
    fn test_release_drops_idle_entries_only() {
        let locks = AliasLockManager::new();
        locks.with_alias_lock("a", || Ok(())).unwrap();
        locks
            .with_alias_lock("b", || {
                // "b" is held here, so only "a" goes away
                locks.release("a")?;
                locks.release("b")?;
                locks.release("never-locked")?;
                assert_eq!(locks.alias_count()?, 1);
                Ok(())
            })
            .unwrap();
        locks.release("b").unwrap();
        assert_eq!(locks.alias_count().unwrap(), 0);
    }

    #[test]
    fn test_try_lock_reports_busy_alias() {
        let locks = AliasLockManager::new();
        locks
            .with_alias_lock("a", || {
                assert!(locks.try_with_alias_lock("a", || Ok(())).unwrap().is_none());
                assert_eq!(locks.try_with_alias_lock("b", || Ok(1)).unwrap(), Some(1));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_same_alias_is_serialized() {
        let locks = Arc::new(AliasLockManager::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    locks
                        .with_alias_lock("shared", || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_inside.fetch_max(now, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(5));
                            inside.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }
}
