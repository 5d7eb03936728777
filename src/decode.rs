//! Structure decoding with hooks.
//!
//! [`Decoder`] turns any serializable document (a parsed TOML, JSON or YAML
//! file) into a typed value. Before `serde` sees the document, every leaf is
//! passed through the decoder's hooks; hook errors are reported with the
//! dotted path of the offending field.

use crate::error::{Error, Result};
use crate::hook::{ComposedHook, DecodeHook, Kind};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use vault_inject_core::{ReferenceError, ReferenceParser, SecretAddress};

/// Decodes documents into typed values, running hooks on every leaf.
///
/// Hooks run in registration order. Leaves keep their kind through the walk,
/// so a leaf is presented as a conversion from its kind to the same kind.
///
/// # Example
///
/// ```
/// use serde::Deserialize;
/// use serde_json::json;
/// use vault_inject::decode::Decoder;
/// use vault_inject::hook::Resolver;
/// use vault_inject::store::{MemoryStore, SecretRecord};
///
/// #[derive(Deserialize)]
/// struct Database {
///     address: String,
///     password: String,
/// }
///
/// let store = MemoryStore::new().with_mount_secret(
///     "test",
///     "foo",
///     SecretRecord::new().with_field("password1", "abc123"),
/// );
/// let decoder = Decoder::new().with_hook(Resolver::new(store));
///
/// let db: Database = decoder
///     .decode(&json!({
///         "address": "127.0.0.1",
///         "password": "{vault://vault.org/_/test/foo/password1}",
///     }))
///     .unwrap();
/// assert_eq!(db.password, "abc123");
/// ```
#[derive(Default)]
pub struct Decoder {
    hooks: ComposedHook,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(mut self, hook: impl DecodeHook + 'static) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Runs the hooks over `input` and deserializes the result into `T`.
    pub fn decode<T, I>(&self, input: &I) -> Result<T>
    where
        T: DeserializeOwned,
        I: Serialize + ?Sized,
    {
        let value = serde_json::to_value(input)?;
        let value = self.apply(value)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Runs the hooks over every leaf of `value`.
    pub fn apply(&self, value: Value) -> Result<Value> {
        self.walk(String::new(), value)
    }

    fn walk(&self, path: String, value: Value) -> Result<Value> {
        match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(key, child)| -> Result<(String, Value)> {
                    let child_path = join_path(&path, &key);
                    Ok((key, self.walk(child_path, child)?))
                })
                .collect::<Result<serde_json::Map<_, _>>>()
                .map(Value::Object),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, child)| self.walk(format!("{path}[{index}]"), child))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            leaf => {
                let kind = Kind::of(&leaf);
                self.hooks
                    .call(kind, kind, leaf)
                    .map_err(|source| Error::Decode {
                        path: display_path(path),
                        source: Box::new(source),
                    })
            }
        }
    }
}

/// A secret reference found in a document.
#[derive(Debug)]
pub struct ReferenceEntry {
    /// Dotted path of the field holding the reference
    pub path: String,
    /// The reference as written
    pub raw: String,
    /// The parsed address, or why the reference is malformed
    pub address: std::result::Result<SecretAddress, ReferenceError>,
}

/// Lists every secret reference in `value` without contacting a store.
///
/// Strings that are not references are skipped; malformed references are
/// listed with their parse error.
pub fn scan_references(value: &Value, parser: &ReferenceParser) -> Vec<ReferenceEntry> {
    let mut entries = Vec::new();
    scan(value, String::new(), parser, &mut entries);
    entries
}

fn scan(value: &Value, path: String, parser: &ReferenceParser, entries: &mut Vec<ReferenceEntry>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                scan(child, join_path(&path, key), parser, entries);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                scan(child, format!("{path}[{index}]"), parser, entries);
            }
        }
        Value::String(raw) => {
            let address = match parser.parse(raw) {
                Ok(None) => return,
                Ok(Some(address)) => Ok(address),
                Err(e) => Err(e),
            };
            entries.push(ReferenceEntry {
                path: display_path(path),
                raw: raw.clone(),
                address,
            });
        }
        _ => {}
    }
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn display_path(path: String) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path
    }
}
