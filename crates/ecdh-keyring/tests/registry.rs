//! End-to-end loading behavior against real files.

use ecdh_keyring::{Curve, EntryError, KeyExchange, RegistryError};
use ecdh_keyring_testkit::{agrees, init_tracing, KeyringFixture};
use serde_json::json;

#[test]
fn skips_entry_with_empty_curve() {
    init_tracing();
    let fixture = KeyringFixture::new();
    let k1 = fixture.write_key("k1.pem", Curve::Secp256k1);
    fixture.write_keys_list(
        "keys.json",
        &json!({
            "k1": { "curve": "secp256k1", "privateKey": "k1.pem" },
            "k2": { "curve": "", "privateKey": "k2.pem" }
        }),
    );

    let (registry, report) = ecdh_keyring::KeyRegistry::initialize_with_report(
        fixture.protocol(),
        fixture.settings().clone(),
        ecdh_keyring::source::FsSecretLoader,
    )
    .unwrap();

    assert_eq!(registry.key_ids(), vec!["k1".to_string()]);
    assert!(agrees(&registry, "k1", &k1));
    assert!(matches!(
        registry.derive_key("k2", &KeyExchange::generate(Curve::Secp256k1).public_key(), 32),
        Err(RegistryError::KeyNotFound(id)) if id == "k2"
    ));

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].key_id, "k2");
    assert_eq!(report.failures[0].protocol, "tcp");
    assert!(matches!(report.failures[0].error, EntryError::EmptyCurve));
    assert!(!report.has_anonymous());
}

#[test]
fn anonymous_key_without_key_list() {
    init_tracing();
    let fixture = KeyringFixture::new();
    let anon = fixture.write_key("anon.key", Curve::X25519);
    fixture.configure_anonymous("x25519", fixture.path("anon.key"));

    let registry = fixture.registry().unwrap();

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.key_ids(), vec![String::new()]);
    assert!(agrees(&registry, "", &anon));
}

#[test]
fn missing_key_list_fails_regardless_of_anonymous_key() {
    init_tracing();
    let fixture = KeyringFixture::new();
    fixture.write_key("anon.key", Curve::X25519);
    fixture.configure_anonymous("x25519", fixture.path("anon.key"));
    fixture.configure_keys_list(fixture.path("does-not-exist.json"));

    let err = fixture.registry().unwrap_err();
    assert!(matches!(err, RegistryError::Load { ref protocol, .. } if protocol == "tcp"));
    assert!(err.to_string().contains("does-not-exist.json"));
}

#[test]
fn malformed_key_list_fails() {
    let fixture = KeyringFixture::new();
    let path = fixture.write_file("keys.json", "{ \"k1\": ");
    fixture.configure_keys_list(&path);

    assert!(matches!(fixture.registry(), Err(RegistryError::Load { .. })));
}

#[test]
fn anonymous_key_requires_curve_and_file() {
    init_tracing();
    let fixture = KeyringFixture::new();
    let anon = fixture.write_key("anon.key", Curve::X25519);
    let peer = KeyExchange::generate(Curve::X25519).public_key();

    // Curve only.
    fixture
        .settings()
        .set("server.tcp.security.ecdh.curve", "x25519");
    let registry = fixture.registry().unwrap();
    assert!(matches!(
        registry.derive_key("", &peer, 32),
        Err(RegistryError::KeyNotFound(_))
    ));

    // File only.
    fixture.settings().remove("server.tcp.security.ecdh.curve");
    fixture.settings().set(
        "server.tcp.security.ecdh.private_key",
        fixture.path("anon.key").display().to_string(),
    );
    let (registry, report) = ecdh_keyring::KeyRegistry::initialize_with_report(
        "tcp",
        fixture.settings().clone(),
        ecdh_keyring::source::FsSecretLoader,
    )
    .unwrap();
    assert!(registry.is_empty());
    assert!(matches!(report.failures[0].error, EntryError::MissingCurve));

    // Both, via the global fallback for the curve.
    fixture.settings().set("server.security.ecdh.curve", "x25519");
    let registry = fixture.registry().unwrap();
    assert!(registry.derive_key("", &peer, 32).is_ok());
    assert!(agrees(&registry, "", &anon));
}

#[test]
fn relative_and_absolute_key_paths() {
    let fixture = KeyringFixture::new();
    let nested = fixture.write_key("conf/keys/nested.key", Curve::Secp256r1);
    let absolute = fixture.write_key("elsewhere/abs.key", Curve::X25519);
    fixture.write_keys_list(
        "conf/keys.json",
        &json!({
            "nested": { "curve": "secp256r1", "privateKey": "keys/nested.key" },
            "absolute": {
                "curve": "x25519",
                "privateKey": fixture.path("elsewhere/abs.key").display().to_string()
            }
        }),
    );

    let registry = fixture.registry().unwrap();
    assert_eq!(
        registry.key_ids(),
        vec!["absolute".to_string(), "nested".to_string()]
    );
    assert!(agrees(&registry, "nested", &nested));
    assert!(agrees(&registry, "absolute", &absolute));
}

#[test]
fn disabled_entries_are_skipped_silently() {
    let fixture = KeyringFixture::new();
    fixture.write_key("off.key", Curve::X25519);
    let on = fixture.write_hex_key("on.key", Curve::Secp256k1);
    fixture.write_keys_list(
        "keys.json",
        &json!({
            "off": { "curve": "x25519", "privateKey": "off.key", "enable": false },
            "on": { "curve": "secp256k1", "privateKey": "on.key", "enable": true }
        }),
    );

    let (registry, report) = ecdh_keyring::KeyRegistry::initialize_with_report(
        "tcp",
        fixture.settings().clone(),
        ecdh_keyring::source::FsSecretLoader,
    )
    .unwrap();
    assert_eq!(registry.key_ids(), vec!["on".to_string()]);
    assert!(report.is_clean());
    assert!(agrees(&registry, "on", &on));
}

#[test]
fn session_keys_of_both_lengths() {
    let fixture = KeyringFixture::new();
    let server = fixture.write_key("k.key", Curve::Secp256k1);
    fixture.write_keys_list(
        "keys.json",
        &json!({ "k": { "curve": "secp256k1", "privateKey": "k.key" } }),
    );
    let registry = fixture.registry().unwrap();
    let client = KeyExchange::generate(Curve::Secp256k1);

    for key_len in [16, 32] {
        let derived = registry.derive_key("k", &client.public_key(), key_len).unwrap();
        let expected = client.derive_key(&server.public_key(), key_len).unwrap();
        assert_eq!(derived.key().len(), key_len);
        assert_eq!(derived.key(), expected.key());
        assert_eq!(derived.iv(), expected.iv());
    }
}

#[test]
fn add_key_never_overwrites_loaded_key() {
    let fixture = KeyringFixture::new();
    let loaded = fixture.write_key("k.key", Curve::X25519);
    fixture.write_keys_list(
        "keys.json",
        &json!({ "k": { "curve": "x25519", "privateKey": "k.key" } }),
    );
    let registry = fixture.registry().unwrap();

    let intruder = KeyExchange::generate(Curve::X25519);
    assert!(matches!(
        registry.add_key("x25519", &intruder.private_key_bytes()[..], "k"),
        Err(RegistryError::KeyExists(_))
    ));
    assert!(agrees(&registry, "k", &loaded));
    assert!(!agrees(&registry, "k", &intruder));
}
