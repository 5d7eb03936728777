//! # Response cache
//!
//! Vault only serves whole secrets, so a configuration that references several
//! fields of one secret would read it once per field. The [`ResponseCache`]
//! keeps every secret fetched through it for its whole lifetime:
//!
//! - entries are inserted once and never replaced, updated or expired
//! - lookups and inserts are safe from any number of threads
//! - concurrent misses for the same key share one fetch
//!
//! The cache is an ordinary value. Share it between resolvers with an `Arc`
//! to share fetched secrets, or give each resolver its own.

use crate::store::SecretRecord;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Identifies one secret: the (namespace, mount path, secret name) triple as
/// written in the reference, sentinels included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub namespace: String,
    pub mount_path: String,
    pub secret_name: String,
}

impl CacheKey {
    pub fn new(
        namespace: impl Into<String>,
        mount_path: impl Into<String>,
        secret_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            mount_path: mount_path.into(),
            secret_name: secret_name.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.mount_path, self.secret_name)
    }
}

/// Read-through cache of whole secret records.
#[derive(Debug)]
pub struct ResponseCache {
    enabled: bool,
    entries: RwLock<HashMap<CacheKey, Arc<SecretRecord>>>,
    in_flight: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ResponseCache {
    /// Creates an empty cache. A disabled cache never stores anything and
    /// sends every lookup to the fetch function.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<SecretRecord>> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Inserts `record` unless `key` is already present, and returns the
    /// stored record. Existing entries are never replaced.
    pub fn insert(&self, key: CacheKey, record: SecretRecord) -> Arc<SecretRecord> {
        self.entries
            .write()
            .entry(key)
            .or_insert_with(|| Arc::new(record))
            .clone()
    }

    /// Returns the record for `key`, calling `fetch` on a miss and storing
    /// its result.
    ///
    /// Concurrent callers missing on the same key wait for the first one's
    /// fetch instead of issuing their own. A failed fetch stores nothing, so
    /// each waiter then tries its own fetch.
    ///
    /// When the cache is disabled `fetch` is called every time and nothing is
    /// stored.
    pub fn get_or_fetch<E, F>(&self, key: &CacheKey, fetch: F) -> Result<Arc<SecretRecord>, E>
    where
        F: FnOnce() -> Result<SecretRecord, E>,
    {
        if !self.enabled {
            return fetch().map(Arc::new);
        }

        if let Some(record) = self.get(key) {
            debug!(key = %key, "secret cache hit");
            return Ok(record);
        }

        let flight = self.in_flight.lock().entry(key.clone()).or_default().clone();
        let _guard = flight.lock();
        // Dropped before `_guard`, also when `fetch` panics
        let _landing = Landing { cache: self, key };

        if let Some(record) = self.get(key) {
            debug!(key = %key, "secret fetched by a concurrent caller");
            return Ok(record);
        }

        debug!(key = %key, "secret cache miss");
        fetch().map(|record| self.insert(key.clone(), record))
    }
}

/// Clears the in-flight entry of a key once its fetch finishes or unwinds.
struct Landing<'a> {
    cache: &'a ResponseCache,
    key: &'a CacheKey,
}

impl Drop for Landing<'_> {
    fn drop(&mut self) {
        self.cache.in_flight.lock().remove(self.key);
    }
}
