use sbox_domain::config::{
    CipherKind, LoggingConfig, SessionConfig, StateConfig, StorageConfig, SwitchPolicy,
};
use serde_json::json;

#[test]
fn config_defaults_are_sane() {
    let storage = StorageConfig::default();
    assert!(storage.persist);
    assert!(!storage.compression);
    assert_eq!(storage.data_dir, std::path::PathBuf::from("data"));

    let logging = LoggingConfig::default();
    assert_eq!(logging.level, "info");
    assert!(logging.console);
    assert!(logging.path.is_none());

    let session = SessionConfig::default();
    assert_eq!(session.switch_policy, SwitchPolicy::KeepUnlocked);
    assert_eq!(session.password_history_limit, 100);
}

#[test]
fn state_config_deserializes_partial_documents() {
    let raw = json!({
        "storage": { "data_dir": "/tmp/sbox", "persist": false },
        "security": { "cipher": "chacha" },
        "session": { "switch_policy": "lock_previous" }
    });

    let cfg: StateConfig = serde_json::from_value(raw).expect("config deserialize");
    assert_eq!(cfg.storage.data_dir, std::path::PathBuf::from("/tmp/sbox"));
    assert!(!cfg.storage.persist);
    assert_eq!(cfg.security.cipher, CipherKind::Chacha);
    assert_eq!(cfg.session.switch_policy, SwitchPolicy::LockPrevious);
    assert_eq!(cfg.session.password_history_limit, 100);
    assert_eq!(cfg.logging.name, "strongbox");
}

#[test]
fn deref_mut_copies_on_write() {
    let original = StateConfig::default();
    let mut edited = original.clone();
    edited.session.password_history_limit = 5;

    assert_eq!(original.session.password_history_limit, 100);
    assert_eq!(edited.session.password_history_limit, 5);
}
