//! Per-key async mutex registry: backs the orchestrator's per-requestId
//! advisory lock, as well as hold-level serialization (capture, release,
//! and expire on one holdId never interleave).
//!
//! Entries are reaped opportunistically: every call to `lock` sweeps out
//! keys with no outstanding holder before (possibly) inserting a new one,
//! so the registry's steady-state size tracks the number of concurrently
//! in-flight keys rather than every key ever seen across the process
//! lifetime.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct KeyedLock<K> {
    entries: StdMutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> KeyedLock<K> {
    pub fn new() -> Self {
        Self {
            entries: StdMutex::new(HashMap::new()),
        }
    }

    /// Acquire the mutex for `key`, creating it if this is the first
    /// caller to touch it. The returned guard serializes every other
    /// caller locking the same key until it is dropped.
    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut entries = self.entries.lock().unwrap();
            entries.retain(|_, mutex| Arc::strong_count(mutex) > 1);
            entries.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        mutex.lock_owned().await
    }

    /// Drop entries whose mutex has no other live reference. Safe to
    /// call periodically; never removes a key someone is actively
    /// holding or waiting on.
    pub fn sweep(&self) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLock<K> {
    fn default() -> Self {
        Self::new()
    }
}
