//! Per-key mutual exclusion for in-flight renders.
//!
//! Each entry counts the callers holding or waiting on it; the last one out, whether it
//! finished or was cancelled mid-wait, removes the key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug)]
struct Entry {
    lock: Arc<AsyncMutex<()>>,
    users: usize,
}

type LockMap = HashMap<String, Entry>;

#[derive(Clone, Debug, Default)]
pub struct KeyedLocks {
    map: Arc<Mutex<LockMap>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other guard for `key` is alive, then hold it.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let (registration, lock) = Registration::join(&self.map, key);
        let guard = lock.lock_owned().await;
        KeyGuard {
            _guard: guard,
            registration,
        }
    }

    /// Number of keys currently held or awaited.
    pub fn len(&self) -> usize {
        self.map
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One caller's claim on a map entry, released on drop.
#[derive(Debug)]
struct Registration {
    key: String,
    map: Arc<Mutex<LockMap>>,
}

impl Registration {
    fn join(map: &Arc<Mutex<LockMap>>, key: &str) -> (Self, Arc<AsyncMutex<()>>) {
        let mut entries = map.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(key.to_owned()).or_insert_with(|| Entry {
            lock: Arc::new(AsyncMutex::new(())),
            users: 0,
        });
        entry.users += 1;
        let lock = Arc::clone(&entry.lock);
        let registration = Self {
            key: key.to_owned(),
            map: Arc::clone(map),
        };
        (registration, lock)
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut entries = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get_mut(&self.key) {
            entry.users = entry.users.saturating_sub(1);
            if entry.users == 0 {
                entries.remove(&self.key);
            }
        }
    }
}

/// Held lock for one key. Fields drop in order: the mutex is released before the
/// registration is withdrawn.
#[derive(Debug)]
pub struct KeyGuard {
    _guard: OwnedMutexGuard<()>,
    registration: Registration,
}

impl KeyGuard {
    pub fn key(&self) -> &str {
        &self.registration.key
    }
}
