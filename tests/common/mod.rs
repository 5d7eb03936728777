use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use vault_inject::{MemoryStore, SecretRecord};

#[allow(dead_code)]
pub const MOUNT: &str = "test";
pub const SECRET: &str = "foo";
pub const VALUE1: &str = "abc123";
pub const VALUE2: &str = "correct horse battery staple";

/// The secret `foo` in mount `test` with two password fields.
pub fn seeded_store() -> MemoryStore {
    MemoryStore::new().with_mount_secret(
        MOUNT,
        SECRET,
        SecretRecord::new()
            .with_field("password1", VALUE1)
            .with_field("password2", VALUE2),
    )
}

/// Test helper for writing configuration files into a temporary directory
#[allow(dead_code)]
pub struct TestFixture {
    _temp_dir: TempDir,
    pub base_path: PathBuf,
}

#[allow(dead_code)]
impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            base_path,
        }
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.base_path.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// Writes the same application config in TOML, JSON and YAML.
    pub fn create_app_configs(&self) -> Vec<PathBuf> {
        let toml = r#"
address = "127.0.0.1"
database = "example"
username = "root"
password = "{vault://vault.org/_/test/foo/password1}"

[replica]
address = "10.0.0.2"
password = "{ vault://vault.org/_/test/foo/password2 }"
"#;
        let json = r#"{
  "address": "127.0.0.1",
  "database": "example",
  "username": "root",
  "password": "{vault://vault.org/_/test/foo/password1}",
  "replica": {
    "address": "10.0.0.2",
    "password": "{ vault://vault.org/_/test/foo/password2 }"
  }
}"#;
        let yaml = r#"
address: 127.0.0.1
database: example
username: root
password: "{vault://vault.org/_/test/foo/password1}"
replica:
  address: 10.0.0.2
  password: "{ vault://vault.org/_/test/foo/password2 }"
"#;

        vec![
            self.write("app.toml", toml),
            self.write("app.json", json),
            self.write("app.yaml", yaml),
        ]
    }
}

#[allow(dead_code)]
impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
