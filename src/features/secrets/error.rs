//! Error types shared by the key provider and the preference store.

use thiserror::Error;

/// Failures of the symmetric cipher or of key material.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Ciphertext was modified, truncated or sealed under another key
    #[error("ciphertext failed authentication")]
    AuthenticationFailed,

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decrypted value is not valid UTF-8")]
    MalformedPlaintext,
}

/// Errors from [`get_or_create_key`](super::get_or_create_key)
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Failure reported by the raw preference backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] sqlite::Error),

    #[error("storage backend: {0}")]
    Backend(String),
}

/// Errors from the encrypted preference store
#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("preference '{name}' not found for subject {subject}")]
    NotFound { subject: String, name: String },

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PreferenceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PreferenceError::NotFound { .. })
    }
}
