use super::{KvStore, ReadOptions, SecretRecord, StoreError};
use serde::{Deserialize, Serialize};
use std::process::Command;
use tracing::debug;

/// Response of `vault kv get -format=json` on a KV v2 mount.
#[derive(Debug, Deserialize)]
struct KvV2ReadResponse {
    data: Option<KvV2Data>,
}

#[derive(Debug, Deserialize)]
struct KvV2Data {
    /// The secret's fields; `null` for a deleted version.
    data: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Configuration for the Vault CLI store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultCliConfig {
    /// Path or name of the `vault` binary
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Vault server address, passed as `VAULT_ADDR`. Inherited from the
    /// environment when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Mount used when a reference asks for the default mount (`_`)
    #[serde(default = "default_mount")]
    pub default_mount: String,
}

fn default_binary() -> String {
    "vault".to_string()
}

fn default_mount() -> String {
    "secret".to_string()
}

impl Default for VaultCliConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            address: None,
            default_mount: default_mount(),
        }
    }
}

/// Reads KV v2 secrets through the `vault` command line client.
///
/// Authentication is whatever the CLI is configured with (`VAULT_TOKEN`, the
/// token helper, ...). The namespace of a read is passed as `VAULT_NAMESPACE`.
///
/// # Requirements
///
/// The Vault CLI must be installed and logged in:
/// - Install: https://developer.hashicorp.com/vault/install
/// - `vault login` or export `VAULT_TOKEN`
pub struct VaultCli {
    config: VaultCliConfig,
}

impl VaultCli {
    pub fn new(config: VaultCliConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VaultCliConfig {
        &self.config
    }

    fn build_command(&self, name: &str, options: &ReadOptions) -> Command {
        let mount = options
            .mount_path
            .as_deref()
            .unwrap_or(&self.config.default_mount);

        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("kv")
            .arg("get")
            .arg("-format=json")
            .arg(format!("-mount={mount}"))
            // Names starting with `-` must not be read as flags
            .arg("--")
            .arg(name);

        if let Some(address) = &self.config.address {
            cmd.env("VAULT_ADDR", address);
        }
        if let Some(namespace) = &options.namespace {
            cmd.env("VAULT_NAMESPACE", namespace);
        }

        cmd
    }

    fn execute(&self, name: &str, options: &ReadOptions) -> Result<String, StoreError> {
        let output = match self.build_command(name, options).output() {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::CliNotInstalled(self.config.binary.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        if !output.status.success() {
            let error_msg = String::from_utf8_lossy(&output.stderr);
            if error_msg.contains("No value found") {
                return Err(StoreError::NotFound(name.to_string()));
            }
            return Err(StoreError::CommandFailed(error_msg.trim().to_string()));
        }

        String::from_utf8(output.stdout).map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }
}

impl KvStore for VaultCli {
    fn kv_read(&self, name: &str, options: &ReadOptions) -> Result<SecretRecord, StoreError> {
        debug!(
            secret = name,
            namespace = options.namespace.as_deref().unwrap_or("<default>"),
            mount = options.mount_path.as_deref().unwrap_or(&self.config.default_mount),
            "reading secret with vault cli"
        );

        let output = self.execute(name, options)?;
        parse_kv_response(name, &output)
    }

    fn name(&self) -> &'static str {
        "vault"
    }
}

/// Extracts the secret fields from a `vault kv get -format=json` response.
fn parse_kv_response(name: &str, output: &str) -> Result<SecretRecord, StoreError> {
    let response: KvV2ReadResponse = serde_json::from_str(output)?;

    response
        .data
        .and_then(|data| data.data)
        .map(SecretRecord::from)
        .ok_or_else(|| StoreError::NotFound(name.to_string()))
}
