//! # Feature: Encrypted Preference Store
//!
//! Named per-user string values, sealed with the deployment key before they
//! reach the storage backend. Only ciphertext crosses the backend boundary.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Clear related retry counters when a value is replaced
//! - 1.0.0: Initial release with AES-256-GCM sealing

use super::cipher;
use super::error::{PreferenceError, StorageError};
use super::key::SecretKey;
use async_trait::async_trait;
use log::{debug, error};
use std::collections::HashMap;
use std::sync::Arc;

/// Raw storage collaborator for preference blobs.
///
/// Implementations must be safe for concurrent use; the store adds no locking
/// of its own.
#[async_trait]
pub trait PreferenceBackend: Send + Sync {
    /// Fetch the stored blob, `None` when the row is absent
    async fn get_preference(&self, subject: &str, name: &str)
        -> Result<Option<Vec<u8>>, StorageError>;

    async fn upsert_preference(
        &self,
        subject: &str,
        name: &str,
        value: &[u8],
    ) -> Result<(), StorageError>;

    /// Remove the row; deleting a missing row succeeds
    async fn delete_preference(&self, subject: &str, name: &str) -> Result<(), StorageError>;

    /// Subjects that currently have a row named `name`
    async fn subjects_with(&self, name: &str) -> Result<Vec<String>, StorageError>;
}

/// Encrypts and decrypts preferences on top of a [`PreferenceBackend`]
#[derive(Clone)]
pub struct PreferenceStore {
    key: Arc<SecretKey>,
    backend: Arc<dyn PreferenceBackend>,
    reset_on_set: HashMap<String, Vec<String>>,
}

impl PreferenceStore {
    pub fn new(key: Arc<SecretKey>, backend: Arc<dyn PreferenceBackend>) -> Self {
        Self {
            key,
            backend,
            reset_on_set: HashMap::new(),
        }
    }

    /// Delete `counters` for the subject whenever `name` is (re)set.
    pub fn with_reset_on_set(mut self, name: &str, counters: &[&str]) -> Self {
        self.reset_on_set.insert(
            name.to_string(),
            counters.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    /// Seal `plaintext` and upsert it under (subject, name).
    ///
    /// Counters registered through [`with_reset_on_set`](Self::with_reset_on_set)
    /// are cleared afterwards; failing to clear one is logged and ignored.
    pub async fn set_encrypted(
        &self,
        subject: &str,
        name: &str,
        plaintext: &str,
    ) -> Result<(), PreferenceError> {
        let blob = cipher::seal(&self.key, subject, name, plaintext)?;
        self.backend.upsert_preference(subject, name, &blob).await?;
        debug!("Stored encrypted preference '{name}' for {subject}");

        if let Some(counters) = self.reset_on_set.get(name) {
            for counter in counters {
                if let Err(e) = self.backend.delete_preference(subject, counter).await {
                    error!("Failed to clear '{counter}' preference for {subject}: {e}");
                }
            }
        }

        Ok(())
    }

    pub async fn get_decrypted(&self, subject: &str, name: &str) -> Result<String, PreferenceError> {
        let blob = self
            .backend
            .get_preference(subject, name)
            .await?
            .ok_or_else(|| PreferenceError::NotFound {
                subject: subject.to_string(),
                name: name.to_string(),
            })?;

        Ok(cipher::open(&self.key, subject, name, &blob)?)
    }

    /// Like [`get_decrypted`](Self::get_decrypted) but maps a missing row to `None`
    pub async fn find_decrypted(
        &self,
        subject: &str,
        name: &str,
    ) -> Result<Option<String>, PreferenceError> {
        match self.get_decrypted(subject, name).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn delete_preference(&self, subject: &str, name: &str) -> Result<(), PreferenceError> {
        self.backend.delete_preference(subject, name).await?;
        Ok(())
    }

    pub async fn subjects_with(&self, name: &str) -> Result<Vec<String>, PreferenceError> {
        Ok(self.backend.subjects_with(name).await?)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// In-memory backend that can be told to fail deletes
    #[derive(Default)]
    pub struct MemoryBackend {
        pub rows: Mutex<BTreeMap<(String, String), Vec<u8>>>,
        pub fail_deletes: bool,
    }

    impl MemoryBackend {
        pub fn raw(&self, subject: &str, name: &str) -> Option<Vec<u8>> {
            self.rows
                .lock()
                .unwrap()
                .get(&(subject.to_string(), name.to_string()))
                .cloned()
        }

        pub fn put_raw(&self, subject: &str, name: &str, value: Vec<u8>) {
            self.rows
                .lock()
                .unwrap()
                .insert((subject.to_string(), name.to_string()), value);
        }
    }

    #[async_trait]
    impl PreferenceBackend for MemoryBackend {
        async fn get_preference(
            &self,
            subject: &str,
            name: &str,
        ) -> Result<Option<Vec<u8>>, StorageError> {
            Ok(self.raw(subject, name))
        }

        async fn upsert_preference(
            &self,
            subject: &str,
            name: &str,
            value: &[u8],
        ) -> Result<(), StorageError> {
            self.put_raw(subject, name, value.to_vec());
            Ok(())
        }

        async fn delete_preference(&self, subject: &str, name: &str) -> Result<(), StorageError> {
            if self.fail_deletes {
                return Err(StorageError::Backend("delete refused".to_string()));
            }
            self.rows
                .lock()
                .unwrap()
                .remove(&(subject.to_string(), name.to_string()));
            Ok(())
        }

        async fn subjects_with(&self, name: &str) -> Result<Vec<String>, StorageError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .keys()
                .filter(|(_, n)| n == name)
                .map(|(s, _)| s.clone())
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryBackend;
    use super::*;
    use crate::features::secrets::error::CryptoError;
    use crate::features::secrets::key::KEY_LEN;

    fn key(byte: u8) -> Arc<SecretKey> {
        Arc::new(SecretKey::from_bytes(&[byte; KEY_LEN]).unwrap())
    }

    fn store_with(backend: Arc<MemoryBackend>) -> PreferenceStore {
        PreferenceStore::new(key(0x42), backend)
            .with_reset_on_set("rat_cookie", &["failed_rat_notify", "failed_rat_tries"])
    }

    #[tokio::test]
    async fn test_set_then_get_roundtrip() {
        let store = store_with(Arc::new(MemoryBackend::default()));

        store.set_encrypted("U1", "rat_cookie", "abc123").await.unwrap();
        assert_eq!(store.get_decrypted("U1", "rat_cookie").await.unwrap(), "abc123");
    }

    #[tokio::test]
    async fn test_only_ciphertext_reaches_backend() {
        let backend = Arc::new(MemoryBackend::default());
        let store = store_with(backend.clone());

        store.set_encrypted("U1", "rat_cookie", "abc123").await.unwrap();
        let raw = backend.raw("U1", "rat_cookie").unwrap();
        assert!(!raw.windows(6).any(|w| w == b"abc123"));
    }

    #[tokio::test]
    async fn test_missing_preference_is_not_found() {
        let store = store_with(Arc::new(MemoryBackend::default()));

        let err = store.get_decrypted("U1", "rat_cookie").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.find_decrypted("U1", "rat_cookie").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_tampered_value_fails_authentication() {
        let backend = Arc::new(MemoryBackend::default());
        let store = store_with(backend.clone());
        store.set_encrypted("U1", "rat_cookie", "abc123").await.unwrap();

        let mut raw = backend.raw("U1", "rat_cookie").unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        backend.put_raw("U1", "rat_cookie", raw);

        let err = store.get_decrypted("U1", "rat_cookie").await.unwrap_err();
        assert!(matches!(
            err,
            PreferenceError::Crypto(CryptoError::AuthenticationFailed)
        ));
    }

    #[tokio::test]
    async fn test_other_key_fails_authentication() {
        let backend = Arc::new(MemoryBackend::default());
        let writer = PreferenceStore::new(key(0x01), backend.clone());
        let reader = PreferenceStore::new(key(0x02), backend);

        writer.set_encrypted("U1", "rat_cookie", "abc123").await.unwrap();
        let err = reader.get_decrypted("U1", "rat_cookie").await.unwrap_err();
        assert!(matches!(
            err,
            PreferenceError::Crypto(CryptoError::AuthenticationFailed)
        ));
    }

    #[tokio::test]
    async fn test_set_clears_retry_counters() {
        let backend = Arc::new(MemoryBackend::default());
        let store = store_with(backend.clone());
        store.set_encrypted("U1", "failed_rat_tries", "3").await.unwrap();
        store.set_encrypted("U1", "failed_rat_notify", "1").await.unwrap();
        store.set_encrypted("U2", "failed_rat_tries", "2").await.unwrap();

        store.set_encrypted("U1", "rat_cookie", "fresh").await.unwrap();

        assert!(backend.raw("U1", "failed_rat_tries").is_none());
        assert!(backend.raw("U1", "failed_rat_notify").is_none());
        // Other subjects keep their counters
        assert!(backend.raw("U2", "failed_rat_tries").is_some());
    }

    #[tokio::test]
    async fn test_counter_clear_failure_does_not_fail_set() {
        let backend = Arc::new(MemoryBackend {
            fail_deletes: true,
            ..Default::default()
        });
        let store = store_with(backend.clone());

        store.set_encrypted("U1", "rat_cookie", "abc123").await.unwrap();
        assert_eq!(store.get_decrypted("U1", "rat_cookie").await.unwrap(), "abc123");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = store_with(Arc::new(MemoryBackend::default()));
        store.set_encrypted("U1", "rat_cookie", "abc123").await.unwrap();

        store.delete_preference("U1", "rat_cookie").await.unwrap();
        store.delete_preference("U1", "rat_cookie").await.unwrap();
        assert!(store.get_decrypted("U1", "rat_cookie").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_subjects_with_lists_owners() {
        let store = store_with(Arc::new(MemoryBackend::default()));
        store.set_encrypted("U1", "rat_cookie", "a").await.unwrap();
        store.set_encrypted("U2", "rat_cookie", "b").await.unwrap();
        store.set_encrypted("U3", "other", "c").await.unwrap();

        let mut subjects = store.subjects_with("rat_cookie").await.unwrap();
        subjects.sort();
        assert_eq!(subjects, vec!["U1", "U2"]);
    }
}
