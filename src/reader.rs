//! Read path from a secret address to a whole secret record.

use crate::cache::{CacheKey, ResponseCache};
use crate::error::{Error, Result};
use crate::store::{KvStore, ReadOptions, SecretRecord};
use std::sync::Arc;
use tracing::{debug, info};

/// Reads whole secrets from a [`KvStore`] through a [`ResponseCache`].
pub struct SecretReader<S> {
    store: S,
    cache: Arc<ResponseCache>,
}

impl<S: KvStore> SecretReader<S> {
    /// Creates a reader with its own enabled cache.
    pub fn new(store: S) -> Self {
        Self::with_cache(store, Arc::new(ResponseCache::default()))
    }

    /// Creates a reader sharing `cache`, e.g. with other readers of the same
    /// store.
    pub fn with_cache(store: S, cache: Arc<ResponseCache>) -> Self {
        Self { store, cache }
    }

    /// Creates a reader with its own cache, enabled or not.
    ///
    /// With caching disabled every read goes to the store.
    pub fn with_cache_enabled(store: S, enabled: bool) -> Self {
        Self::with_cache(store, Arc::new(ResponseCache::new(enabled)))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Returns the record of `secret_name`.
    ///
    /// `namespace` and `mount_path` are reference segments: `_` selects the
    /// store's default.
    ///
    /// # Errors
    ///
    /// Store failures are returned as [`Error::SecretFetch`].
    pub fn read(
        &self,
        namespace: &str,
        mount_path: &str,
        secret_name: &str,
    ) -> Result<Arc<SecretRecord>> {
        let key = CacheKey::new(namespace, mount_path, secret_name);
        self.cache
            .get_or_fetch(&key, || self.fetch(namespace, mount_path, secret_name))
    }

    fn fetch(&self, namespace: &str, mount_path: &str, secret_name: &str) -> Result<SecretRecord> {
        let options = ReadOptions::from_segments(namespace, mount_path);
        debug!(
            store = self.store.name(),
            secret = secret_name,
            ?options,
            "fetching secret"
        );

        let record = self
            .store
            .kv_read(secret_name, &options)
            .map_err(|source| Error::SecretFetch {
                secret: secret_name.to_string(),
                source,
            })?;

        info!(
            store = self.store.name(),
            secret = secret_name,
            fields = record.len(),
            "fetched secret"
        );
        Ok(record)
    }
}
