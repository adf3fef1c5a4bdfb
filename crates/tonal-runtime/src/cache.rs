//! Caching layer for tonal-runtime.
//!
//! Memoizes expensive collaborator calls. Entries are keyed by a SHA-256
//! digest of their logical inputs inside a namespace, so identical inputs
//! always land on the same entry. Expiry is lazy: a lookup that finds an
//! expired entry evicts it, and [`ExpiringCache::purge_expired`] sweeps
//! the rest on demand.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Namespaces used by the tone workflow.
pub mod namespaces {
    pub const ANALYSIS: &str = "analysis";
    pub const REWRITE: &str = "rewrite";
    pub const EVALUATION: &str = "evaluation";
}

/// Default time-to-live for cache entries.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Cache key: namespace plus content digest of the raw key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: String,
    digest: [u8; 32],
}

impl CacheKey {
    /// Hash `raw_key` into a key within `namespace`.
    pub fn new(namespace: &str, raw_key: &str) -> Self {
        let digest: [u8; 32] = Sha256::digest(raw_key.as_bytes()).into();
        Self {
            namespace: namespace.to_string(),
            digest,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.digest_hex())
    }
}

/// Join logical inputs into one raw key.
///
/// Each part is length-prefixed, so `["ab", "c"]` and `["a", "bc"]` never
/// collide.
pub fn compose_key<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut raw = String::new();
    for part in parts {
        let part = part.as_ref();
        raw.push_str(&part.len().to_string());
        raw.push(':');
        raw.push_str(part);
    }
    raw
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Entries currently stored, expired or not
    pub total_entries: usize,

    /// Stored entries already past their TTL at the time of the call
    pub expired_entries: usize,

    /// Lookups that returned a value since process start
    pub hits: u64,

    /// Lookups that returned nothing since process start
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Thread-safe key/value store with TTL expiry and namespace eviction.
///
/// Every operation takes the internal lock for the duration of a single map
/// access only, so readers never observe a partially written entry and a
/// namespace clear cannot drop a concurrent insert into another namespace.
pub struct ExpiringCache<V> {
    entries: Mutex<HashMap<CacheKey, Entry<V>>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> ExpiringCache<V> {
    /// Create a cache whose entries live for `ttl` after insertion.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a live entry, evicting it if it has expired.
    pub fn get(&self, namespace: &str, raw_key: &str) -> Option<V> {
        let key = CacheKey::new(namespace, raw_key);
        let now = Instant::now();

        let found = {
            let mut entries = self.entries.lock();
            let live = entries.get(&key).map(|entry| !self.is_expired(entry, now));
            match live {
                Some(true) => entries.get(&key).map(|entry| entry.value.clone()),
                Some(false) => {
                    entries.remove(&key);
                    tracing::debug!(key = %key, "Evicted expired cache entry");
                    None
                }
                None => None,
            }
        };

        match found {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(namespace, "Cache hit");
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(namespace, "Cache miss");
                None
            }
        }
    }

    /// Insert or overwrite an entry, restarting its TTL.
    pub fn put(&self, namespace: &str, raw_key: &str, value: V) {
        let key = CacheKey::new(namespace, raw_key);
        let entry = Entry {
            value,
            inserted_at: Instant::now(),
        };
        self.entries.lock().insert(key, entry);
    }

    /// Remove every entry in `namespace`, or everything when `None`.
    ///
    /// Returns the number of entries removed.
    pub fn clear(&self, namespace: Option<&str>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        match namespace {
            Some(ns) => entries.retain(|key, _| key.namespace != ns),
            None => entries.clear(),
        }
        let removed = before - entries.len();
        tracing::debug!(namespace = ?namespace, removed, "Cleared cache entries");
        removed
    }

    /// Remove every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        before - entries.len()
    }

    /// Snapshot of the cache state.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries.lock();
        CacheStats {
            total_entries: entries.len(),
            expired_entries: entries
                .values()
                .filter(|entry| self.is_expired(entry, now))
                .count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) >= self.ttl
    }
}

impl<V: Clone> Default for ExpiringCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V> fmt::Debug for ExpiringCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}
