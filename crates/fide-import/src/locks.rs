//! Per-key async locks.
//!
//! Imports of the same `(period, category)` must not interleave: the snapshot
//! merge is a read-then-write. Distinct keys proceed independently.

use std::{hash::Hash, sync::Arc};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct KeyedLocks<K> {
  locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
  pub fn new() -> Self { Self { locks: DashMap::new() } }

  /// Wait for exclusive access to `key`. Held until the guard is dropped.
  pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
    let lock = self
      .locks
      .entry(key)
      .or_insert_with(|| Arc::new(Mutex::new(())))
      .clone();
    // Drop entries nobody holds or waits on.
    self.locks.retain(|_, l| Arc::strong_count(l) > 1);
    lock.lock_owned().await
  }

  /// Number of keys currently tracked.
  pub fn len(&self) -> usize { self.locks.len() }

  pub fn is_empty(&self) -> bool { self.locks.is_empty() }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
  fn default() -> Self { Self::new() }
}
