use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Resource whose bookings must be checked and written without interleaving.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    Room(String),
    Teacher(String),
    Student(String),
}

/// Keyed critical sections around check-then-write sequences.
///
/// A request takes every key it is about to check before reading, and holds
/// them until its write has landed. Keys are always taken in sorted order, so
/// two requests sharing keys cannot deadlock.
#[derive(Default)]
pub struct BookingLocks {
    entries: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

/// Releases its keys when dropped.
pub struct BookingGuard {
    _held: Vec<OwnedMutexGuard<()>>,
}

impl BookingLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, keys: impl IntoIterator<Item = LockKey>) -> BookingGuard {
        let keys: BTreeSet<LockKey> = keys.into_iter().collect();
        let mut held = Vec::with_capacity(keys.len());
        for key in keys {
            let mutex = self.entry(key);
            held.push(mutex.lock_owned().await);
        }
        BookingGuard { _held: held }
    }

    fn entry(&self, key: LockKey) -> Arc<AsyncMutex<()>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        // nobody holds or waits on an entry whose only reference is the map
        entries.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        entries.entry(key).or_default().clone()
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
