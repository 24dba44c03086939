//! AES-256-GCM sealing of preference values.
//!
//! Blob layout: 12-byte nonce followed by ciphertext and 16-byte tag. The
//! subject and preference name are bound in as associated data, so a blob
//! copied to another row fails authentication just like a tampered one.

use super::error::CryptoError;
use super::key::SecretKey;
use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

/// Nonce length for AES-GCM (96 bits)
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag length
pub const TAG_LEN: usize = 16;

fn associated_data(subject: &str, name: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(subject.len() + name.len() + 1);
    aad.extend_from_slice(subject.as_bytes());
    aad.push(0);
    aad.extend_from_slice(name.as_bytes());
    aad
}

pub fn seal(
    key: &SecretKey,
    subject: &str,
    name: &str,
    plaintext: &str,
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let aad = associated_data(subject, name);

    let ciphertext = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext.as_bytes(),
                aad: &aad,
            },
        )
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

pub fn open(key: &SecretKey, subject: &str, name: &str, blob: &[u8]) -> Result<String, CryptoError> {
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::AuthenticationFailed);
    }

    let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let aad = associated_data(subject, name);

    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: &aad,
            },
        )
        .map_err(|_| CryptoError::AuthenticationFailed)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::MalformedPlaintext)
}
