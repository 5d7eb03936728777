use super::{KvStore, ReadOptions, SecretRecord, StoreError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A read-only store serving records seeded at construction.
///
/// Records are looked up by the exact [`ReadOptions`] and secret name, so a
/// secret seeded under mount `test` is not visible through the default mount.
/// Every read is counted, which makes the store useful for checking cache
/// behavior.
///
/// # Example
///
/// ```
/// use vault_inject::store::{KvStore, MemoryStore, ReadOptions, SecretRecord};
///
/// let store = MemoryStore::new().with_mount_secret(
///     "test",
///     "foo",
///     SecretRecord::new().with_field("password1", "abc123"),
/// );
///
/// let record = store.kv_read("foo", &ReadOptions::from_segments("_", "test")).unwrap();
/// assert_eq!(record.get("password1").and_then(|v| v.as_str()), Some("abc123"));
/// assert_eq!(store.reads(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    secrets: HashMap<(ReadOptions, String), SecretRecord>,
    latency: Option<Duration>,
    reads: AtomicUsize,
    reads_by_name: Mutex<HashMap<String, usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `record` under `name` for reads made with `options`.
    pub fn with_secret(
        mut self,
        options: ReadOptions,
        name: impl Into<String>,
        record: SecretRecord,
    ) -> Self {
        self.secrets.insert((options, name.into()), record);
        self
    }

    /// Seeds `record` under `name` in `mount`, default namespace.
    pub fn with_mount_secret(
        self,
        mount: impl Into<String>,
        name: impl Into<String>,
        record: SecretRecord,
    ) -> Self {
        let options = ReadOptions {
            namespace: None,
            mount_path: Some(mount.into()),
        };
        self.with_secret(options, name, record)
    }

    /// Makes every read sleep for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Total number of reads served, failed reads included.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of reads made for `name`.
    pub fn reads_of(&self, name: &str) -> usize {
        self.reads_by_name.lock().get(name).copied().unwrap_or(0)
    }
}

impl KvStore for MemoryStore {
    fn kv_read(&self, name: &str, options: &ReadOptions) -> Result<SecretRecord, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        *self.reads_by_name.lock().entry(name.to_string()).or_default() += 1;

        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }

        self.secrets
            .get(&(options.clone(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
