//! Configuration documents and the global user configuration.

use crate::error::{Error, Result};
use crate::store::VaultCliConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Serialization format of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
    Yaml,
}

impl Format {
    /// Picks the format from a file extension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] for unknown or missing extensions.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        extension.parse()
    }

    /// Parses `content` into a document tree.
    pub fn parse(self, content: &str) -> Result<Value> {
        Ok(match self {
            Format::Toml => toml::from_str(content)?,
            Format::Json => serde_json::from_str(content)?,
            Format::Yaml => serde_yaml::from_str(content)?,
        })
    }

    /// Renders a document tree in this format.
    pub fn render(self, value: &Value) -> Result<String> {
        Ok(match self {
            Format::Toml => toml::to_string_pretty(value)?,
            Format::Json => serde_json::to_string_pretty(value)?,
            Format::Yaml => serde_yaml::to_string(value)?,
        })
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "toml" => Ok(Format::Toml),
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Reads and parses a configuration document, choosing the format from the
/// file extension.
pub fn load_document(path: &Path) -> Result<Value> {
    let format = Format::from_path(path)?;
    let content = fs::read_to_string(path)?;
    format.parse(&content)
}

/// Global user configuration for vault-inject.
///
/// Stored in the user's config directory, it provides defaults for the CLI.
///
/// ```toml
/// [defaults]
/// cache = true
///
/// [vault]
/// address = "https://127.0.0.1:8200"
/// binary = "vault"
/// default_mount = "secret"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GlobalConfig {
    /// Default settings
    #[serde(default)]
    pub defaults: GlobalDefaults,
    /// How to reach Vault
    #[serde(default)]
    pub vault: VaultCliConfig,
}

/// Default settings in the global configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GlobalDefaults {
    /// Whether fetched secrets are cached for the run; enabled when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<bool>,
}

impl GlobalConfig {
    /// Gets the path to the global configuration file, typically
    /// `~/.config/vault-inject/config.toml` on Unix systems.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined
    pub fn path() -> std::result::Result<PathBuf, io::Error> {
        use directories::ProjectDirs;
        let dirs = ProjectDirs::from("", "", "vault-inject").ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "Could not find config directory")
        })?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Loads the global user configuration, `None` if there is none.
    pub fn load() -> Result<Option<Self>> {
        Self::load_from(&Self::path()?)
    }

    /// Loads a configuration file, `None` if it does not exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(toml::from_str(&content)?))
    }

    /// Saves the global configuration to disk.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Writes the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn cache_enabled(&self) -> bool {
        self.defaults.cache.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("app.toml")).unwrap(), Format::Toml);
        assert_eq!(Format::from_path(Path::new("app.JSON")).unwrap(), Format::Json);
        assert_eq!(Format::from_path(Path::new("app.yml")).unwrap(), Format::Yaml);
        assert!(matches!(
            Format::from_path(Path::new("app.ini")),
            Err(Error::UnsupportedFormat(ext)) if ext == "ini"
        ));
        assert!(Format::from_path(Path::new("Makefile")).is_err());
    }

    #[test]
    fn test_formats_parse_to_the_same_tree() {
        let toml = r#"
address = "127.0.0.1"
password = "{vault://vault.org/_/test/foo/password1}"
"#;
        let yaml = r#"
address: 127.0.0.1
password: "{vault://vault.org/_/test/foo/password1}"
"#;
        let json = r#"{"address": "127.0.0.1", "password": "{vault://vault.org/_/test/foo/password1}"}"#;

        let expected = json!({
            "address": "127.0.0.1",
            "password": "{vault://vault.org/_/test/foo/password1}",
        });
        assert_eq!(Format::Toml.parse(toml).unwrap(), expected);
        assert_eq!(Format::Yaml.parse(yaml).unwrap(), expected);
        assert_eq!(Format::Json.parse(json).unwrap(), expected);
    }

    #[test]
    fn test_load_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.json");
        fs::write(&path, r#"{"port": 8080}"#).unwrap();

        assert_eq!(load_document(&path).unwrap(), json!({"port": 8080}));
        assert!(matches!(
            load_document(&temp_dir.path().join("missing.json")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_global_config_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        assert!(GlobalConfig::load_from(&path).unwrap().is_none());

        let config = GlobalConfig {
            defaults: GlobalDefaults { cache: Some(false) },
            vault: VaultCliConfig {
                address: Some("https://127.0.0.1:8200".to_string()),
                ..Default::default()
            },
        };
        config.save_to(&path).unwrap();

        let loaded = GlobalConfig::load_from(&path).unwrap().unwrap();
        assert!(!loaded.cache_enabled());
        assert_eq!(loaded.vault.address.as_deref(), Some("https://127.0.0.1:8200"));
        assert_eq!(loaded.vault.binary, "vault");
    }

    #[test]
    fn test_global_config_defaults() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert!(config.cache_enabled());
        assert_eq!(config.vault.default_mount, "secret");
    }
}
