use std::sync::Arc;

use sotbot::database::Database;
use sotbot::features::secrets::{
    get_or_create_key, CryptoError, PreferenceBackend, PreferenceError, PreferenceStore,
    FAILED_RAT_NOTIFY, FAILED_RAT_TRIES, RAT_COOKIE,
};
use tempfile::tempdir;

async fn open_store(dir: &std::path::Path) -> (PreferenceStore, Database) {
    let key = get_or_create_key(&dir.join("sotbot.key")).await.unwrap();
    let database = Database::new(dir.join("sotbot.db").to_str().unwrap())
        .await
        .unwrap();
    let store = PreferenceStore::new(Arc::new(key), Arc::new(database.clone()))
        .with_reset_on_set(RAT_COOKIE, &[FAILED_RAT_NOTIFY, FAILED_RAT_TRIES]);
    (store, database)
}

#[tokio::test]
async fn test_cookie_survives_restart_and_detects_tampering() {
    let dir = tempdir().unwrap();

    let (store, database) = open_store(dir.path()).await;
    store.set_encrypted("U1", RAT_COOKIE, "abc123").await.unwrap();

    let raw = database
        .get_preference("U1", RAT_COOKIE)
        .await
        .unwrap()
        .unwrap();
    assert!(!raw.windows(6).any(|w| w == b"abc123"));
    drop(store);

    // Second process start: same key file, same database
    let (store, database) = open_store(dir.path()).await;
    assert_eq!(store.get_decrypted("U1", RAT_COOKIE).await.unwrap(), "abc123");

    let mut tampered = raw.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 0x01;
    database
        .upsert_preference("U1", RAT_COOKIE, &tampered)
        .await
        .unwrap();

    let err = store.get_decrypted("U1", RAT_COOKIE).await.unwrap_err();
    assert!(matches!(
        err,
        PreferenceError::Crypto(CryptoError::AuthenticationFailed)
    ));
}

#[tokio::test]
async fn test_setting_cookie_resets_failure_counters() {
    let dir = tempdir().unwrap();
    let (store, _database) = open_store(dir.path()).await;

    store.set_encrypted("U1", RAT_COOKIE, "old").await.unwrap();
    store.set_encrypted("U1", FAILED_RAT_TRIES, "3").await.unwrap();
    store.set_encrypted("U1", FAILED_RAT_NOTIFY, "1").await.unwrap();

    store.set_encrypted("U1", RAT_COOKIE, "new").await.unwrap();

    assert!(store
        .get_decrypted("U1", FAILED_RAT_TRIES)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(store
        .find_decrypted("U1", FAILED_RAT_NOTIFY)
        .await
        .unwrap()
        .is_none());
    assert_eq!(store.subjects_with(RAT_COOKIE).await.unwrap(), vec!["U1"]);
}
