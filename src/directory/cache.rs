//! Time-to-live cache for directory lookups.
//!
//! Entries expire lazily on read, measured against the injected [`Clock`].
//! There is no background sweeper.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use chrono::Duration;
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::types::Instant;

/// Key/value cache whose entries expire `ttl` after they were set.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, (V, Instant)>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Cached value for `key`, dropping it if it has expired.
    pub async fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((value, expires_at)) if now < *expires_at => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `value`, sweeping out whatever has already expired.
    pub async fn set(&self, key: K, value: V) {
        let now = self.clock.now();
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(Instant::MAX_UTC);
        let mut entries = self.entries.lock().await;
        entries.retain(|_, (_, expiry)| now < *expiry);
        entries.insert(key, (value, expires_at));
    }

    /// Drop one entry. Returns whether it was present.
    pub async fn invalidate(&self, key: &K) -> bool {
        self.entries.lock().await.remove(key).is_some()
    }

    /// Drop every entry whose key matches `predicate`. Returns how many went.
    pub async fn invalidate_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&K) -> bool,
    {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|key, _| !predicate(key));
        before - entries.len()
    }

    /// Number of stored entries, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
