//! # Secret stores
//!
//! The store module defines the single operation vault-inject needs from a
//! secret store: reading a whole key/value secret. Stores are read-only from
//! this crate's point of view.
//!
//! ## Available Stores
//!
//! - [`VaultCli`]: Vault KV v2 through the `vault` command line client
//! - [`MemoryStore`]: seeded in-memory records, for tests and offline use
//!
//! Any other client can be plugged in by implementing [`KvStore`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use vault_inject_core::DEFAULT_SENTINEL;

pub mod memory;
pub mod vault;

pub use memory::MemoryStore;
pub use vault::{VaultCli, VaultCliConfig};

/// Errors returned by a [`KvStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(
        "Vault CLI ({0}) is not installed.\n\nInstall it from https://developer.hashicorp.com/vault/install and make sure it is on your PATH."
    )]
    CliNotInstalled(String),
    #[error("secret '{0}' not found")]
    NotFound(String),
    #[error("vault command failed: {0}")]
    CommandFailed(String),
    #[error("unexpected vault response: {0}")]
    InvalidResponse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Per-request addressing options for a KV read.
///
/// `None` means the client's default namespace or mount path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReadOptions {
    pub namespace: Option<String>,
    pub mount_path: Option<String>,
}

impl ReadOptions {
    /// Builds options from reference segments, treating `_` as "default".
    pub fn from_segments(namespace: &str, mount_path: &str) -> Self {
        let explicit = |segment: &str| (segment != DEFAULT_SENTINEL).then(|| segment.to_string());
        Self {
            namespace: explicit(namespace),
            mount_path: explicit(mount_path),
        }
    }
}

/// A single value of a secret's data.
///
/// Vault stores arbitrary JSON per field; only strings can be injected into
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SecretValue {
    String(String),
    Other(serde_json::Value),
}

impl SecretValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SecretValue::String(s) => Some(s),
            SecretValue::Other(_) => None,
        }
    }
}

impl From<serde_json::Value> for SecretValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => SecretValue::String(s),
            other => SecretValue::Other(other),
        }
    }
}

impl From<&str> for SecretValue {
    fn from(value: &str) -> Self {
        SecretValue::String(value.to_string())
    }
}

impl From<String> for SecretValue {
    fn from(value: String) -> Self {
        SecretValue::String(value)
    }
}

/// The full data of one secret, as returned by one KV read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretRecord {
    fields: HashMap<String, SecretValue>,
}

impl SecretRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<SecretValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&SecretValue> {
        self.fields.get(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for SecretRecord {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for SecretRecord
where
    K: Into<String>,
    V: Into<SecretValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The read operation of a key/value secret store.
///
/// # Thread Safety
///
/// Stores must be `Send + Sync`: a resolver may be shared by decoders running
/// on several threads.
pub trait KvStore: Send + Sync {
    /// Reads the whole secret `name`.
    ///
    /// Deadlines and cancellation are the store's concern; the caller blocks
    /// until this returns.
    fn kv_read(&self, name: &str, options: &ReadOptions) -> Result<SecretRecord, StoreError>;

    /// Returns the name of this store for display purposes
    fn name(&self) -> &'static str;
}

impl<S: KvStore + ?Sized> KvStore for std::sync::Arc<S> {
    fn kv_read(&self, name: &str, options: &ReadOptions) -> Result<SecretRecord, StoreError> {
        (**self).kv_read(name, options)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<S: KvStore + ?Sized> KvStore for Box<S> {
    fn kv_read(&self, name: &str, options: &ReadOptions) -> Result<SecretRecord, StoreError> {
        (**self).kv_read(name, options)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
