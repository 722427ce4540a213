use config::{ConfigManager, ConfigSource};
use errors::SecretError;
use serial_test::serial;
use std::sync::Arc;
use storage::{ENCRYPTED_PREFIX, SecretCipher, SecretStore, is_sealed};

#[test]
fn encrypt_decrypt_round_trip_and_key_mismatch() {
    let cipher = SecretCipher::from_passphrase("operator-secret");
    let other = SecretCipher::from_passphrase("different-secret");

    for plaintext in ["", "sk-ant-api03-xyz", "  padded  ", "line\nbreak", "ключ"] {
        let token = cipher.encrypt(plaintext).expect("encrypt");
        assert_eq!(cipher.decrypt(&token).expect("decrypt"), plaintext);
        assert!(matches!(
            other.decrypt(&token),
            Err(SecretError::Decryption { .. })
        ));
    }
}

#[test]
#[serial]
fn setting_the_same_sensitive_value_twice_never_double_seals() {
    let dir = tempfile::tempdir().expect("tempdir");
    let env_path = dir.path().join(".env");
    let store = SecretStore::new(SecretCipher::from_passphrase("operator-secret"))
        .with_env_file(&env_path);

    store
        .set("MODELHUB_TEST_KEY", "sk-same", true, true)
        .expect("first set");
    let first = store.list(true, Some("MODELHUB_TEST_KEY"))["MODELHUB_TEST_KEY"].clone();
    store
        .set("MODELHUB_TEST_KEY", "sk-same", true, true)
        .expect("second set");
    let second = store.list(true, Some("MODELHUB_TEST_KEY"))["MODELHUB_TEST_KEY"].clone();

    for stored in [&first, &second] {
        assert!(is_sealed(stored));
        assert_eq!(stored.matches(ENCRYPTED_PREFIX).count(), 1);
    }
    assert_eq!(
        store
            .get("MODELHUB_TEST_KEY", None, true)
            .expect("get")
            .as_deref(),
        Some("sk-same")
    );

    store.set("MODELHUB_TEST_KEY", &second, true, false).expect("reseal");
    let third = store.list(true, Some("MODELHUB_TEST_KEY"))["MODELHUB_TEST_KEY"].clone();
    assert_eq!(third, second);

    let on_disk = std::fs::read_to_string(&env_path).expect("read env file");
    assert!(!on_disk.contains("sk-same"));
}

#[test]
#[serial]
fn persisted_secrets_survive_a_new_store_and_feed_settings() {
    let dir = tempfile::tempdir().expect("tempdir");
    let env_path = dir.path().join(".env");
    unsafe {
        std::env::remove_var("ANTHROPIC_API_KEY");
    }

    SecretStore::new(SecretCipher::from_passphrase("operator-secret"))
        .with_env_file(&env_path)
        .set("ANTHROPIC_API_KEY", "sk-ant-persisted", true, true)
        .expect("persist secret");

    let store = SecretStore::new(SecretCipher::from_passphrase("operator-secret"))
        .with_env_file(&env_path);
    store.load_env_file(&env_path, false).expect("load env file");

    let manager = ConfigManager::with_sources(vec![Arc::new(store) as Arc<dyn ConfigSource>]);
    assert_eq!(
        manager.get_settings().llm.anthropic.api_key,
        "sk-ant-persisted"
    );
}
