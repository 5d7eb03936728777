//! # Decode hooks
//!
//! A decode hook is called by a structure decoder for every value it converts,
//! with the kind the value has in the source document and the kind the decoder
//! is converting it to. The hook returns the value to decode, unchanged or
//! replaced, or an error that aborts decoding of that field.
//!
//! [`Resolver`] is the hook that turns secret references into secret values:
//!
//! ```
//! use vault_inject::hook::{DecodeHook, Kind, Resolver};
//! use vault_inject::store::{MemoryStore, SecretRecord};
//! use serde_json::json;
//!
//! let store = MemoryStore::new().with_mount_secret(
//!     "test",
//!     "foo",
//!     SecretRecord::new().with_field("password1", "abc123"),
//! );
//! let resolver = Resolver::new(store);
//!
//! let value = resolver
//!     .call(Kind::String, Kind::String, json!("{vault://vault.org/_/test/foo/password1}"))
//!     .unwrap();
//! assert_eq!(value, json!("abc123"));
//! ```

use crate::cache::ResponseCache;
use crate::error::{Error, Result};
use crate::reader::SecretReader;
use crate::store::{KvStore, SecretValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use vault_inject_core::{ReferenceParser, SecretAddress};

/// The kind of a value as seen by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Seq,
    Map,
}

impl Kind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Number(n) if n.is_f64() => Kind::Float,
            Value::Number(_) => Kind::Int,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Seq,
            Value::Object(_) => Kind::Map,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Seq => "seq",
            Kind::Map => "map",
        };
        f.write_str(name)
    }
}

/// A value transformation run by the decoder before a value is converted.
pub trait DecodeHook: Send + Sync {
    /// Transforms `value`, about to be converted from kind `from` to kind `to`.
    fn call(&self, from: Kind, to: Kind, value: Value) -> Result<Value>;
}

impl<H: DecodeHook + ?Sized> DecodeHook for &H {
    fn call(&self, from: Kind, to: Kind, value: Value) -> Result<Value> {
        (**self).call(from, to, value)
    }
}

impl<H: DecodeHook + ?Sized> DecodeHook for Box<H> {
    fn call(&self, from: Kind, to: Kind, value: Value) -> Result<Value> {
        (**self).call(from, to, value)
    }
}

impl<H: DecodeHook + ?Sized> DecodeHook for Arc<H> {
    fn call(&self, from: Kind, to: Kind, value: Value) -> Result<Value> {
        (**self).call(from, to, value)
    }
}

/// Adapts a closure to [`DecodeHook`].
pub struct HookFn<F>(F);

/// Wraps `f` as a decode hook.
pub fn hook_fn<F>(f: F) -> HookFn<F>
where
    F: Fn(Kind, Kind, Value) -> Result<Value> + Send + Sync,
{
    HookFn(f)
}

impl<F> DecodeHook for HookFn<F>
where
    F: Fn(Kind, Kind, Value) -> Result<Value> + Send + Sync,
{
    fn call(&self, from: Kind, to: Kind, value: Value) -> Result<Value> {
        (self.0)(from, to, value)
    }
}

/// Runs hooks in order, each on the previous one's output.
///
/// The source kind passed to each hook is the kind of the value it receives,
/// so a hook that changed the value's kind is seen as such by the next.
#[derive(Default)]
pub struct ComposedHook {
    hooks: Vec<Box<dyn DecodeHook>>,
}

impl ComposedHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hook: impl DecodeHook + 'static) {
        self.hooks.push(Box::new(hook));
    }

    pub fn with(mut self, hook: impl DecodeHook + 'static) -> Self {
        self.push(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl DecodeHook for ComposedHook {
    fn call(&self, from: Kind, to: Kind, value: Value) -> Result<Value> {
        let mut from = from;
        let mut value = value;
        for hook in &self.hooks {
            value = hook.call(from, to, value)?;
            from = Kind::of(&value);
        }
        Ok(value)
    }
}

/// Replaces secret references with the referenced secret field.
///
/// Only string-to-string conversions are touched; every other value, and
/// every string that is not a reference, is returned unchanged.
pub struct Resolver<S> {
    parser: ReferenceParser,
    reader: SecretReader<S>,
}

impl<S: KvStore> Resolver<S> {
    /// Creates a resolver for `{vault://...}` references with caching enabled.
    pub fn new(store: S) -> Self {
        Self::from_reader(SecretReader::new(store))
    }

    /// Creates a resolver sharing `cache` with other resolvers.
    pub fn with_cache(store: S, cache: Arc<ResponseCache>) -> Self {
        Self::from_reader(SecretReader::with_cache(store, cache))
    }

    pub fn from_reader(reader: SecretReader<S>) -> Self {
        Self {
            parser: ReferenceParser::default(),
            reader,
        }
    }

    /// Replaces the reference parser, e.g. to recognize another scheme.
    pub fn with_parser(mut self, parser: ReferenceParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn parser(&self) -> &ReferenceParser {
        &self.parser
    }

    pub fn reader(&self) -> &SecretReader<S> {
        &self.reader
    }

    /// Resolves `raw` if it is a reference, otherwise returns it unchanged.
    pub fn resolve_str(&self, raw: &str) -> Result<String> {
        match self.parser.parse(raw)? {
            Some(address) => self.resolve_address(&address),
            None => Ok(raw.to_string()),
        }
    }

    /// Returns the string value of the field `address` points to.
    ///
    /// # Errors
    ///
    /// - [`Error::SecretFetch`] if the secret cannot be read
    /// - [`Error::FieldNotFound`] if the secret has no such field
    /// - [`Error::UnsupportedValueType`] if the field is not a string
    pub fn resolve_address(&self, address: &SecretAddress) -> Result<String> {
        let record = self.reader.read(
            &address.namespace,
            &address.mount_path,
            &address.secret_name,
        )?;

        match record.get(&address.field) {
            Some(SecretValue::String(value)) => {
                debug!(reference = %address, "resolved secret reference");
                Ok(value.clone())
            }
            Some(SecretValue::Other(_)) => Err(Error::UnsupportedValueType {
                field: address.field.clone(),
                secret: address.secret_name.clone(),
            }),
            None => Err(Error::FieldNotFound {
                field: address.field.clone(),
                secret: address.secret_name.clone(),
            }),
        }
    }
}

impl<S: KvStore> DecodeHook for Resolver<S> {
    fn call(&self, from: Kind, to: Kind, value: Value) -> Result<Value> {
        if from != Kind::String || to != Kind::String {
            return Ok(value);
        }

        match value {
            Value::String(raw) => match self.parser.parse(&raw)? {
                Some(address) => self.resolve_address(&address).map(Value::String),
                None => Ok(Value::String(raw)),
            },
            other => Ok(other),
        }
    }
}
