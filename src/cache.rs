//! Time-boxed, capacity-bounded cache keyed by path.
//!
//! Entries are evicted least-recently-used first once the capacity is
//! reached. When the cache is left untouched for longer than its maximum
//! age, the whole content is dropped on the next access.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

struct CacheState<V> {
    entries: LruCache<PathBuf, V>,
    last_access: Instant,
}

pub struct Cache<V> {
    state: Mutex<CacheState<V>>,
    max_age: Duration,
}

impl<V: Clone> Cache<V> {
    /// Create a cache dropping everything after `max_age` without access and
    /// holding at most `capacity` entries.
    pub fn new(max_age: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                last_access: Instant::now(),
            }),
            max_age,
        }
    }

    /// Lock the state, expiring it first if idle for too long. Every access
    /// resets the idle timer.
    fn touch(&self) -> MutexGuard<'_, CacheState<V>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        if now.duration_since(state.last_access) >= self.max_age {
            state.entries.clear();
        }
        state.last_access = now;
        state
    }

    pub fn get(&self, key: &Path) -> Option<V> {
        self.touch().entries.get(key).cloned()
    }

    pub fn set(&self, key: impl Into<PathBuf>, value: V) {
        self.touch().entries.put(key.into(), value);
    }

    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.entries.clear();
    }
}
