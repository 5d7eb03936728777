//! vault-inject - Vault secrets inside your configuration files
//!
//! This library replaces secret references written in configuration values
//! with the secret they point to, while the configuration is decoded into
//! typed structures.
//!
//! # Features
//!
//! - **References**: `{vault://host/<namespace>/<mount>/<secret>/<field>}`, with
//!   `_` selecting the default namespace or mount
//! - **Decode hooks**: resolution plugs into any hook-driven decoder through
//!   [`DecodeHook`]; [`Decoder`] is one for `serde` documents
//! - **Caching**: each secret is read once per [`ResponseCache`], however many
//!   of its fields are referenced
//! - **Pluggable stores**: anything implementing [`KvStore`]
//!
//! # Example
//!
//! ```no_run
//! use serde::Deserialize;
//! use vault_inject::{Decoder, Resolver, VaultCli, VaultCliConfig, load_document};
//!
//! #[derive(Deserialize)]
//! struct DbExample {
//!     address: String,
//!     password: String,
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // password = "{vault://vault.org/_/test/foo/password1}"
//!     let document = load_document("app.toml".as_ref())?;
//!
//!     let resolver = Resolver::new(VaultCli::new(VaultCliConfig::default()));
//!     let db: DbExample = Decoder::new().with_hook(resolver).decode(&document)?;
//!
//!     println!("connecting to {}", db.address);
//!     Ok(())
//! }
//! ```

// Internal modules
mod error;

pub mod cache;
pub mod config;
pub mod decode;
pub mod hook;
pub mod reader;
pub mod store;

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;

// Public API exports
pub use cache::{CacheKey, ResponseCache};
pub use config::{Format, GlobalConfig, load_document};
pub use decode::{Decoder, ReferenceEntry, scan_references};
pub use error::{Error, Result};
pub use hook::{ComposedHook, DecodeHook, Kind, Resolver, hook_fn};
pub use reader::SecretReader;
pub use store::{KvStore, MemoryStore, ReadOptions, SecretRecord, SecretValue, StoreError};
pub use store::{VaultCli, VaultCliConfig};

// Re-export the reference grammar
pub use vault_inject_core::{
    DEFAULT_SENTINEL, ReferenceError, ReferenceParser, SecretAddress, VAULT_SCHEME,
};
