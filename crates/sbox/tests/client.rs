pub mod fixtures;

use fixtures::*;
use sbox::domain::config::{CipherKind, SwitchPolicy};
use sbox::domain::{DataDomain, DomainSet};
use sbox::kernel::AccountRegistry;
use sbox::vault::{AeadCrypto, Aes};
use sbox::{Strongbox, StrongboxError, SyncResponse};
use std::sync::Arc;

#[tokio::test]
async fn sync_replaces_domains_and_records_the_time() {
    let sbox = Strongbox::from_config(&memory_config(), apis()).await.unwrap();
    let id = sign_in(&sbox, "sam@example.com").await;
    let stale = sealed_folder(&sbox, "old", "Old").await;
    sbox.folders.state.upsert(stale).await.unwrap();

    let response = SyncResponse {
        folders: vec![sealed_folder(&sbox, "f1", "Banking").await],
        ..SyncResponse::default()
    };
    let synced = sbox.apply_sync(response).await.unwrap();

    assert_eq!(synced, DomainSet::SYNCED);
    let names: Vec<_> = sbox
        .folders
        .get_all_decrypted()
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(names, ["Banking"]);
    assert!(sbox.registry.get(&id).unwrap().profile().last_sync.is_some());
}

#[tokio::test]
async fn sync_stays_with_the_account_it_started_on() {
    let persistence = Arc::new(SwitchingPersistence::default());
    let registry = AccountRegistry::builder(Arc::new(AeadCrypto::<Aes>::new()))
        .persistence(persistence.clone())
        .build();
    let sbox = Strongbox::with_registry(registry, apis(), 10);
    let other = sign_in(&sbox, "kim@example.com").await;
    let id = sign_in(&sbox, "sam@example.com").await;
    let response = SyncResponse {
        folders: vec![sealed_folder(&sbox, "f1", "Banking").await],
        ..SyncResponse::default()
    };

    persistence.switch_on_next_folder_save(&sbox.registry, &other);
    sbox.apply_sync(response).await.unwrap();

    assert_eq!(sbox.registry.active_id(), Some(other.clone()));
    for domain in [
        DataDomain::Folders,
        DataDomain::Ciphers,
        DataDomain::Sends,
        DataDomain::Collections,
        DataDomain::Policies,
    ] {
        assert!(persistence.inner.raw(&id, domain).is_some(), "{domain} saved for sam");
        assert!(persistence.inner.raw(&other, domain).is_none(), "{domain} leaked to kim");
    }
    assert!(sbox.folders.state.get_all().await.unwrap().is_empty());
    assert!(sbox.registry.get(&other).unwrap().profile().last_sync.is_none());
    assert!(sbox.registry.get(&id).unwrap().profile().last_sync.is_some());

    sbox.registry.switch_account(&id).unwrap();
    assert_eq!(sbox.folders.state.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn sync_without_an_active_account_fails() {
    let sbox = Strongbox::from_config(&memory_config(), apis()).await.unwrap();

    let err = sbox.apply_sync(SyncResponse::default()).await.unwrap_err();

    assert!(matches!(
        err,
        StrongboxError::State { source: sbox::kernel::StateError::NoActiveAccount { .. }, .. }
    ));
}

#[tokio::test]
async fn sync_payload_parses_from_server_json() {
    let raw = r#"{
        "folders": [],
        "policies": [
            {"id": "p1", "organizationId": "o1", "type": "disableSend", "enabled": true}
        ]
    }"#;

    let response: SyncResponse = serde_json::from_str(raw).unwrap();

    assert!(response.ciphers.is_empty());
    assert_eq!(response.policies.len(), 1);
}

#[tokio::test]
async fn config_selects_cipher_and_switch_policy() {
    let mut config = memory_config();
    config.security.cipher = CipherKind::Chacha;
    config.session.switch_policy = SwitchPolicy::LockPrevious;
    config.session.password_history_limit = 2;
    let sbox = Strongbox::from_config(&config, apis()).await.unwrap();

    let first = sign_in(&sbox, "a@example.com").await;
    sign_in(&sbox, "b@example.com").await;

    assert!(!sbox.registry.get(&first).unwrap().is_unlocked());
    for pw in ["one", "two", "three"] {
        sbox.password_history.add(pw).await.unwrap();
    }
    assert_eq!(sbox.password_history.history().await.unwrap().len(), 2);
}

#[tokio::test]
async fn state_survives_a_restart_as_ciphertext() {
    let dir = tempfile::tempdir().unwrap();
    let config = disk_config(dir.path());

    {
        let sbox = Strongbox::from_config(&config, apis()).await.unwrap();
        sign_in(&sbox, "sam@example.com").await;
        let response = SyncResponse {
            folders: vec![sealed_folder(&sbox, "f1", "Travel").await],
            ..SyncResponse::default()
        };
        sbox.apply_sync(response).await.unwrap();
    }

    let sbox = Strongbox::from_config(&config, apis()).await.unwrap();
    let id = sbox::domain::AccountId::new("sam@example.com");
    assert!(sbox.registry.active_id().is_none());
    let state = sbox.registry.get(&id).unwrap();
    assert!(!state.is_unlocked());
    assert!(state.profile().last_sync.is_some());

    sbox.registry.switch_account(&id).unwrap();
    assert!(sbox.folders.get_all_decrypted().await.unwrap_err().is_locked());

    sbox.registry.unlock(&id, keys("sam@example.com")).unwrap();
    let folders = sbox.folders.get_all_decrypted().await.unwrap();
    assert_eq!(folders[0].name, "Travel");
}

#[tokio::test]
async fn export_goes_through_the_facade() {
    let sbox = Strongbox::from_config(&memory_config(), apis()).await.unwrap();
    sign_in(&sbox, "sam@example.com").await;
    let response = SyncResponse {
        folders: vec![sealed_folder(&sbox, "f1", "Travel").await],
        ..SyncResponse::default()
    };
    sbox.apply_sync(response).await.unwrap();

    let json = sbox.export_json().await.unwrap();

    assert!(json.contains("Travel"));
}
