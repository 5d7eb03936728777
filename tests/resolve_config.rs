mod common;

use common::{MOUNT, SECRET, TestFixture, VALUE1, VALUE2, seeded_store};
use serde::Deserialize;
use std::sync::Arc;
use vault_inject::{
    Decoder, Error, Format, MemoryStore, Resolver, SecretReader, load_document,
};

#[derive(Debug, Deserialize)]
struct Replica {
    address: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct DbExample {
    address: String,
    database: String,
    username: String,
    password: String,
    replica: Replica,
}

#[test]
fn test_decode_every_format() {
    let fixture = TestFixture::new();

    for path in fixture.create_app_configs() {
        let store = Arc::new(seeded_store());
        let decoder = Decoder::new().with_hook(Resolver::new(Arc::clone(&store)));

        let document = load_document(&path).unwrap();
        let db: DbExample = decoder.decode(&document).unwrap();

        assert_eq!(db.address, "127.0.0.1", "{}", path.display());
        assert_eq!(db.database, "example");
        assert_eq!(db.username, "root");
        assert_eq!(db.password, VALUE1);
        assert_eq!(db.replica.address, "10.0.0.2");
        assert_eq!(db.replica.password, VALUE2);

        // Both fields live in one secret
        assert_eq!(store.reads_of(SECRET), 1, "{}", path.display());
    }
}

#[test]
fn test_decode_without_cache_reads_per_field() {
    let fixture = TestFixture::new();
    let path = fixture.create_app_configs().remove(0);

    let store = Arc::new(seeded_store());
    let resolver = Resolver::from_reader(SecretReader::with_cache_enabled(
        Arc::clone(&store),
        false,
    ));
    let db: DbExample = Decoder::new()
        .with_hook(resolver)
        .decode(&load_document(&path).unwrap())
        .unwrap();

    assert_eq!(db.password, VALUE1);
    assert_eq!(store.reads_of(SECRET), 2);
}

#[test]
fn test_missing_field_aborts_decoding() {
    let fixture = TestFixture::new();
    let path = fixture.write(
        "broken.toml",
        &format!(
            r#"
address = "127.0.0.1"
password = "{{vault://vault.org/_/{MOUNT}/{SECRET}/password3}}"
"#
        ),
    );

    let decoder = Decoder::new().with_hook(Resolver::new(seeded_store()));
    let err = decoder
        .decode::<serde_json::Value, _>(&load_document(&path).unwrap())
        .unwrap_err();

    assert!(err.to_string().contains("password"));
    assert!(matches!(
        err.root(),
        Error::FieldNotFound { field, secret } if field == "password3" && secret == SECRET
    ));
}

#[test]
fn test_resolved_document_renders_back() {
    let fixture = TestFixture::new();
    let path = fixture.create_app_configs().remove(0);

    let resolved = Decoder::new()
        .with_hook(Resolver::new(seeded_store()))
        .apply(load_document(&path).unwrap())
        .unwrap();

    let rendered = Format::Toml.render(&resolved).unwrap();
    assert!(rendered.contains(VALUE1));
    assert!(rendered.contains(VALUE2));
    assert!(!rendered.contains("vault://"));
}

#[test]
fn test_unreachable_secret_is_a_fetch_error() {
    let decoder = Decoder::new().with_hook(Resolver::new(MemoryStore::new()));
    let err = decoder
        .apply(serde_json::json!({"token": "{vault://vault.org/_/kv/api/token}"}))
        .unwrap_err();

    assert!(matches!(err.root(), Error::SecretFetch { secret, .. } if secret == "api"));
}
