//! # Feature: Secret Key Provider
//!
//! Loads the deployment-wide symmetric key from disk, creating it on first run.
//! The key file holds exactly [`KEY_LEN`] raw bytes and is written once with
//! owner-only permissions.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use super::error::{CryptoError, KeyError};
use log::{debug, info, warn};
use rand::RngCore;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;
use zeroize::Zeroize;

/// Key length in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// The symmetric key protecting every stored preference.
///
/// Immutable after construction and wiped from memory on drop.
pub struct SecretKey {
    bytes: [u8; KEY_LEN],
}

impl SecretKey {
    /// Build a key from raw bytes, rejecting anything that is not [`KEY_LEN`] long
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_LEN,
                actual: bytes.len(),
            });
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(Self { bytes: key })
    }

    /// Generate a fresh key from the thread-local CSPRNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey([redacted])")
    }
}

/// Read the key at `path`, or generate and persist one if the file is absent.
///
/// Repeated calls against the same path return the same key bytes. A new key
/// is written to a private temp file and hard-linked into place, so `path`
/// never holds a partial key; if two processes race on first run, the loser
/// re-reads the winner's file.
pub async fn get_or_create_key(path: &Path) -> Result<SecretKey, KeyError> {
    match fs::read(path).await {
        Ok(mut data) => {
            let key = SecretKey::from_bytes(&data);
            data.zeroize();
            let key = key?;
            info!("🔑 Loaded encryption key from {}", path.display());
            Ok(key)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => create_key(path).await,
        Err(e) => Err(e.into()),
    }
}

async fn create_key(path: &Path) -> Result<SecretKey, KeyError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let key = SecretKey::generate();
    let tmp = staging_path(path);

    let published = match write_staged(&tmp, &key).await {
        Ok(()) => fs::hard_link(&tmp, path).await.map_err(KeyError::from),
        Err(e) => Err(e),
    };
    if let Err(e) = fs::remove_file(&tmp).await {
        if e.kind() != ErrorKind::NotFound {
            warn!("Failed to remove staged key file {}: {e}", tmp.display());
        }
    }

    match published {
        Ok(()) => {
            info!("🔑 Generated new encryption key at {}", path.display());
            Ok(key)
        }
        Err(KeyError::Io(e)) if e.kind() == ErrorKind::AlreadyExists => {
            debug!("Key file appeared concurrently at {}, re-reading", path.display());
            read_key(path).await
        }
        Err(e) => Err(e),
    }
}

/// Unique sibling of `path`, so the final link stays on the same file system
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "key".to_string());
    path.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4()))
}

async fn write_staged(tmp: &Path, key: &SecretKey) -> Result<(), KeyError> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(tmp).await?;
    file.write_all(key.as_bytes()).await?;
    file.sync_all().await?;
    Ok(())
}

async fn read_key(path: &Path) -> Result<SecretKey, KeyError> {
    let mut data = fs::read(path).await?;
    let key = SecretKey::from_bytes(&data);
    data.zeroize();
    Ok(key?)
}
