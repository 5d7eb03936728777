//! Error types for vault-inject operations

use thiserror::Error;

// Internal use only
use vault_inject_core::ReferenceError;

use crate::store::StoreError;

/// The main error type for vault-inject operations
///
/// Values that are not secret references never produce an error. Once a value
/// has been identified as a reference, every failure below surfaces to the
/// caller.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid secret reference: {0}")]
    Reference(#[from] ReferenceError),
    #[error("vault kv request failed for secret[{secret}]: {source}")]
    SecretFetch {
        secret: String,
        #[source]
        source: StoreError,
    },
    #[error("field[{field}] not found in secret[{secret}]")]
    FieldNotFound { field: String, secret: String },
    #[error("invalid secret type with field[{field}] in secret[{secret}]: expected a string")]
    UnsupportedValueType { field: String, secret: String },
    #[error("failed to decode '{path}': {source}")]
    Decode {
        path: String,
        #[source]
        source: Box<Error>,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Unsupported configuration format '{0}'. Use .toml, .json, .yaml or .yml")]
    UnsupportedFormat(String),
}

/// A type alias for `Result<T, Error>`
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Strips [`Error::Decode`] context and returns the underlying error.
    pub fn root(&self) -> &Error {
        match self {
            Error::Decode { source, .. } => source.root(),
            other => other,
        }
    }
}
