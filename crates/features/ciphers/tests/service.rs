pub mod fixtures;

use fixtures::*;
use sbox_ciphers::CipherType;
use sbox_domain::ItemId;
use sbox_kernel::StateError;

#[tokio::test]
async fn saved_logins_decrypt_with_all_fields() {
    let h = Harness::signed_in().await;
    let id = h.save_login("Example", "s3cret!").await;

    let views = h.ciphers.get_all_decrypted().await.unwrap();

    assert_eq!(views.len(), 1);
    let view = &views[0];
    assert_eq!(view.id, id);
    assert_eq!(view.kind, CipherType::Login);
    assert_eq!(view.name, "Example");
    let login = view.login.as_ref().unwrap();
    assert_eq!(login.password.as_deref(), Some("s3cret!"));
    assert_eq!(login.uris, vec!["https://example.com"]);
    assert!(!format!("{login:?}").contains("s3cret!"));
}

#[tokio::test]
async fn stored_ciphertext_carries_no_plaintext() {
    let h = Harness::signed_in().await;
    let id = h.save_login("Example", "s3cret!").await;

    let stored = h.ciphers.state.get_encrypted(id.as_str()).await.unwrap().unwrap();
    let json = serde_json::to_string(&stored).unwrap();

    assert!(!json.contains("s3cret!"));
    assert!(!json.contains("Example"));
}

#[tokio::test]
async fn move_many_updates_folder_after_the_server_confirms() {
    let h = Harness::signed_in().await;
    let a = h.save_login("A", "1").await;
    let b = h.save_login("B", "2").await;
    let folder = ItemId::new("folder-1");

    let moved = h
        .ciphers
        .move_many(&[a.clone(), b.clone(), ItemId::new("ghost")], Some(folder.clone()))
        .await
        .unwrap();

    assert_eq!(moved, 2);
    assert_eq!(h.api.moves.lock().len(), 1);
    let filed = h.ciphers.get_all_in_folder(Some(&folder)).await.unwrap();
    assert_eq!(filed.len(), 2);
    assert!(h.ciphers.get_all_in_folder(None).await.unwrap().is_empty());

    h.ciphers.move_many(&[a], None).await.unwrap();
    assert_eq!(h.ciphers.get_all_in_folder(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_move_leaves_the_cache_alone() {
    let h = Harness::signed_in().await;
    let a = h.save_login("A", "1").await;
    *h.api.failing.lock() = true;

    let err = h.ciphers.move_many(&[a], Some(ItemId::new("f"))).await.unwrap_err();

    assert!(matches!(err, StateError::Api { .. }));
    assert_eq!(err.api_status(), None);
    assert_eq!(h.ciphers.get_all_in_folder(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn moves_land_in_the_account_that_requested_them() {
    let h = Harness::signed_in().await;
    let a = h.save_login("A", "1").await;
    let other = h.second_account("alan@example.com").await;
    let folder = ItemId::new("folder-1");

    h.switch_during_next_call(&other);
    let moved = h.ciphers.move_many(&[a], Some(folder.clone())).await.unwrap();

    assert_eq!(moved, 1);
    assert!(h.ciphers.state.get_all().await.unwrap().is_empty());
    h.registry.switch_account(&h.account).unwrap();
    assert_eq!(h.ciphers.get_all_in_folder(Some(&folder)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn saves_land_in_the_account_that_requested_them() {
    let h = Harness::signed_in().await;
    let other = h.second_account("alan@example.com").await;

    h.switch_during_next_call(&other);
    let id = h.save_login("Example", "s3cret!").await;

    assert!(h.ciphers.state.get_encrypted(id.as_str()).await.unwrap().is_none());
    h.registry.switch_account(&h.account).unwrap();
    assert!(h.ciphers.state.get_encrypted(id.as_str()).await.unwrap().is_some());
}

#[tokio::test]
async fn moving_nothing_skips_the_api() {
    let h = Harness::signed_in().await;
    assert_eq!(h.ciphers.move_many(&[], None).await.unwrap(), 0);
    assert!(h.api.moves.lock().is_empty());
}

#[tokio::test]
async fn locked_accounts_cannot_delete_or_move() {
    let h = Harness::signed_in().await;
    let a = h.save_login("A", "1").await;
    h.registry.lock(&h.account).unwrap();

    assert!(h.ciphers.delete(&a).await.unwrap_err().is_locked());
    assert!(h.ciphers.move_many(&[a], None).await.unwrap_err().is_locked());
    assert!(h.api.deleted.lock().is_empty());
    assert!(h.api.moves.lock().is_empty());
}

#[tokio::test]
async fn editing_keeps_the_id_and_replaces_the_view() {
    let h = Harness::signed_in().await;
    let mut draft = login("Mail", "old");
    h.ciphers.save(&mut draft).await.unwrap();
    let id = draft.id.clone().unwrap();

    draft.favorite = true;
    draft.login.as_mut().unwrap().password = Some("new".to_owned());
    h.ciphers.save(&mut draft).await.unwrap();

    assert_eq!(*h.api.created.lock(), 1);
    let views = h.ciphers.get_all_decrypted().await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].id, id);
    assert!(views[0].favorite);
    assert_eq!(views[0].login.as_ref().unwrap().password.as_deref(), Some("new"));

    h.ciphers.delete(&id).await.unwrap();
    assert!(h.ciphers.get_all_decrypted().await.unwrap().is_empty());
}
