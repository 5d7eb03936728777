//! # vault-inject core
//!
//! This crate provides the secret reference grammar and its parser.
//!
//! A secret reference is a configuration value that stands in for a field of a
//! secret stored in Vault's KV engine:
//!
//! ```text
//! {vault://vault.example.com/<namespace>/<mount>/<secret>/<field>}
//! ```
//!
//! The host part is ignored and exists only for readability. `namespace` and
//! `mount` accept [`DEFAULT_SENTINEL`] (`_`) meaning "use the store default";
//! the parser keeps the literal text and leaves that interpretation to the
//! reader.
//!
//! Parsing is tolerant about what it skips and strict about what it accepts:
//! values without the surrounding braces or without the `vault` scheme are
//! ordinary values and pass through, while a value that claims to be a
//! reference but is malformed is an error.

use serde::{Deserialize, Serialize};
use std::fmt;
use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::Url;

/// The URI scheme of secret references.
pub const VAULT_SCHEME: &str = "vault";

/// Segment value meaning "use the store's default namespace or mount path".
pub const DEFAULT_SENTINEL: &str = "_";

/// Errors raised for values that were identified as references but are malformed.
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// The interior of the braces is not a valid URI.
    ///
    /// The raw value is kept so callers can decide on a fallback.
    #[error("url parse failed for secret reference '{raw}': {source}")]
    MalformedUri {
        raw: String,
        #[source]
        source: url::ParseError,
    },
    /// The URI path does not have exactly four non-empty segments.
    #[error(
        "invalid vault path[{path}]: expected <namespace>/<mount>/<secret>/<field>"
    )]
    InvalidPath { path: String },
}

impl ReferenceError {
    /// The raw configuration value when the error carries it.
    pub fn raw(&self) -> Option<&str> {
        match self {
            ReferenceError::MalformedUri { raw, .. } => Some(raw),
            ReferenceError::InvalidPath { .. } => None,
        }
    }
}

/// The structured address of a single field inside a stored secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretAddress {
    /// Vault namespace, or `_` for the client's default
    pub namespace: String,
    /// KV mount path, or `_` for the client's default
    pub mount_path: String,
    /// Secret name inside the mount
    pub secret_name: String,
    /// Field of the secret's data
    pub field: String,
}

impl SecretAddress {
    pub fn new(
        namespace: impl Into<String>,
        mount_path: impl Into<String>,
        secret_name: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            mount_path: mount_path.into(),
            secret_name: secret_name.into(),
            field: field.into(),
        }
    }

    /// Builds an address from the path of a reference URI, as written.
    ///
    /// Segments are percent-decoded one by one after splitting, so an escaped
    /// `%2F` stays inside its segment. Dot segments are kept as they are.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::InvalidPath`] unless the path has exactly four
    /// non-empty segments that decode to UTF-8.
    pub fn from_path(path: &str) -> Result<Self, ReferenceError> {
        let invalid = || ReferenceError::InvalidPath {
            path: path.to_string(),
        };

        let segments = path
            .strip_prefix('/')
            .unwrap_or(path)
            .split('/')
            .map(|segment| {
                percent_decode_str(segment)
                    .decode_utf8()
                    .map_err(|_| invalid())
            })
            .collect::<Result<Vec<_>, _>>()?;

        match segments.as_slice() {
            [namespace, mount_path, secret_name, field]
                if segments.iter().all(|s| !s.is_empty()) =>
            {
                Ok(Self::new(
                    namespace.as_ref(),
                    mount_path.as_ref(),
                    secret_name.as_ref(),
                    field.as_ref(),
                ))
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for SecretAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.namespace, self.mount_path, self.secret_name, self.field
        )
    }
}

/// Recognizes secret references inside arbitrary strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceParser {
    scheme: String,
}

impl Default for ReferenceParser {
    fn default() -> Self {
        Self::new(VAULT_SCHEME)
    }
}

impl ReferenceParser {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Parses `raw` as a secret reference.
    ///
    /// # Returns
    ///
    /// - `Ok(None)` if `raw` is not a reference: it lacks either brace, it has
    ///   no scheme, or its scheme is not this parser's scheme
    /// - `Ok(Some(address))` for a well-formed reference
    ///
    /// # Errors
    ///
    /// A value that starts with the scheme inside braces but is not a valid
    /// URI, or whose path does not have four segments, is an error.
    ///
    /// # Example
    ///
    /// ```
    /// use vault_inject_core::ReferenceParser;
    ///
    /// let parser = ReferenceParser::default();
    /// let address = parser
    ///     .parse("{ vault://vault.org/_/test/foo/password1 }")
    ///     .unwrap()
    ///     .unwrap();
    /// assert_eq!(address.mount_path, "test");
    /// assert_eq!(address.field, "password1");
    ///
    /// assert!(parser.parse("plain value").unwrap().is_none());
    /// ```
    pub fn parse(&self, raw: &str) -> Result<Option<SecretAddress>, ReferenceError> {
        let Some(interior) = strip_delimiters(raw) else {
            return Ok(None);
        };

        if !interior.starts_with(self.scheme.as_str()) {
            return Ok(None);
        }

        let url = match Url::parse(interior) {
            Ok(url) => url,
            // No scheme at all, e.g. `{vault_password}`
            Err(url::ParseError::RelativeUrlWithoutBase)
                if !has_colon_in_first_segment(interior) =>
            {
                return Ok(None);
            }
            Err(source) => {
                return Err(ReferenceError::MalformedUri {
                    raw: raw.to_string(),
                    source,
                });
            }
        };

        if url.scheme() != self.scheme {
            return Ok(None);
        }

        // `Url::path` is normalized and re-encoded, so take the path as written
        SecretAddress::from_path(literal_path(interior, &self.scheme)).map(Some)
    }
}

/// Returns the path of `interior` exactly as written: the text after the
/// scheme and authority, up to any query or fragment.
fn literal_path<'a>(interior: &'a str, scheme: &str) -> &'a str {
    let rest = interior
        .get(scheme.len()..)
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or("");
    let rest = match rest.strip_prefix("//") {
        Some(authority) => authority.find(['/', '?', '#']).map_or("", |i| &authority[i..]),
        None => rest,
    };
    rest.split(['?', '#']).next().unwrap_or(rest)
}

/// A relative reference whose first segment holds a `:` looks like a broken
/// scheme (`vault ://h/...`) rather than a plain value.
fn has_colon_in_first_segment(interior: &str) -> bool {
    interior.split('/').next().is_some_and(|first| first.contains(':'))
}

/// Removes the enclosing braces and at most one space on each side inside them.
///
/// Both braces are required.
fn strip_delimiters(raw: &str) -> Option<&str> {
    let inner = raw.strip_prefix('{')?.strip_suffix('}')?;
    let inner = inner.strip_prefix(' ').unwrap_or(inner);
    Some(inner.strip_suffix(' ').unwrap_or(inner))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<Option<SecretAddress>, ReferenceError> {
        ReferenceParser::default().parse(raw)
    }

    #[test]
    fn test_parse_well_formed_reference() {
        let address = parse("{vault://vault.org/_/test/foo/password1}")
            .unwrap()
            .unwrap();
        assert_eq!(address, SecretAddress::new("_", "test", "foo", "password1"));
    }

    #[test]
    fn test_parse_trims_one_space_inside_braces() {
        let address = parse("{ vault://vault.org/ns/kv/app/token }").unwrap().unwrap();
        assert_eq!(address, SecretAddress::new("ns", "kv", "app", "token"));

        // Only one space is trimmed, so the URI itself starts with a space
        assert!(parse("{  vault://vault.org/ns/kv/app/token}").unwrap().is_none());
    }

    #[test]
    fn test_parse_without_host() {
        let address = parse("{vault:///ns/kv/app/token}").unwrap().unwrap();
        assert_eq!(address.namespace, "ns");
        assert_eq!(address.field, "token");
    }

    #[test]
    fn test_non_references_pass_through() {
        for raw in ["", "abc", "{abc", "abc}", "{vault://h/a/b/c/d", "vault://h/a/b/c/d}"] {
            assert!(parse(raw).unwrap().is_none(), "{raw:?} should pass through");
        }
    }

    #[test]
    fn test_braces_without_scheme_pass_through() {
        assert!(parse("{}").unwrap().is_none());
        assert!(parse("{ }").unwrap().is_none());
        assert!(parse("{\"json\": true}").unwrap().is_none());
        assert!(parse("{othertype://a/b/c/d}").unwrap().is_none());
    }

    #[test]
    fn test_scheme_prefix_with_other_scheme_passes_through() {
        // Starts with the literal but parses to a different scheme
        assert!(parse("{vaults://h/a/b/c/d}").unwrap().is_none());
    }

    #[test]
    fn test_scheme_literal_without_scheme_passes_through() {
        for raw in ["{vault}", "{vaultwarden}", "{vault_password}", "{ vault/a/b/c/d }"] {
            assert!(parse(raw).unwrap().is_none(), "{raw:?} should pass through");
        }
    }

    #[test]
    fn test_malformed_uri_keeps_raw_value() {
        let err = parse("{vault ://h/a/b/c/d}").unwrap_err();
        match &err {
            ReferenceError::MalformedUri { raw, .. } => assert_eq!(raw, "{vault ://h/a/b/c/d}"),
            other => panic!("expected MalformedUri, got {other:?}"),
        }
        assert_eq!(err.raw(), Some("{vault ://h/a/b/c/d}"));

        assert!(matches!(
            parse("{vault://[broken/a/b/c/d}"),
            Err(ReferenceError::MalformedUri { .. })
        ));
    }

    #[test]
    fn test_segments_are_percent_decoded() {
        let address = parse("{vault://h/_/test/my secret/pässwort}").unwrap().unwrap();
        assert_eq!(address.secret_name, "my secret");
        assert_eq!(address.field, "pässwort");

        let address = parse("{vault://h/team%20a/kv/app%2Fprod/p%C3%A4ss}")
            .unwrap()
            .unwrap();
        assert_eq!(address, SecretAddress::new("team a", "kv", "app/prod", "päss"));
    }

    #[test]
    fn test_dot_segments_are_not_normalized() {
        assert!(matches!(
            parse("{vault://h/a/./b/c/d}"),
            Err(ReferenceError::InvalidPath { path }) if path == "/a/./b/c/d"
        ));

        let address = parse("{vault://h/a/../c/d}").unwrap().unwrap();
        assert_eq!(address, SecretAddress::new("a", "..", "c", "d"));
    }

    #[test]
    fn test_query_and_fragment_are_not_part_of_the_path() {
        let address = parse("{vault://h/ns/kv/app/token?version=2#x}").unwrap().unwrap();
        assert_eq!(address, SecretAddress::new("ns", "kv", "app", "token"));
    }

    #[test]
    fn test_wrong_segment_count_is_an_error() {
        let err = parse("{vault://host/a/b}").unwrap_err();
        match err {
            ReferenceError::InvalidPath { path } => assert_eq!(path, "/a/b"),
            other => panic!("expected InvalidPath, got {other:?}"),
        }

        assert!(matches!(
            parse("{vault://host/a/b/c/d/e}"),
            Err(ReferenceError::InvalidPath { .. })
        ));
        assert!(matches!(
            parse("{vault://host/a//c/d}"),
            Err(ReferenceError::InvalidPath { .. })
        ));
        assert!(matches!(
            parse("{vault://host/a/b/c/d/}"),
            Err(ReferenceError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_custom_scheme() {
        let parser = ReferenceParser::new("secret");
        assert!(parser.parse("{secret://h/a/b/c/d}").unwrap().is_some());
        assert!(parser.parse("{vault://h/a/b/c/d}").unwrap().is_none());
        assert_eq!(parser.scheme(), "secret");
    }

    #[test]
    fn test_address_display() {
        let address = SecretAddress::new("_", "test", "foo", "password1");
        assert_eq!(address.to_string(), "_/test/foo/password1");
    }
}
