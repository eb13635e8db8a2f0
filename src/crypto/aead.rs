//! QuickVault Core - AEAD Encryption
//!
//! AES-256-GCM with the nonce prepended. The combined layout
//! `nonce(12) || ciphertext || tag(16)` is frozen: every stored record on
//! every device uses it, so changing it would break all existing data.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;

use super::kdf::MasterKey;
use crate::error::{VaultError, VaultResult};

/// Nonce length for AES-GCM
pub const NONCE_LEN: usize = 12;

/// Authentication tag length
pub const TAG_LEN: usize = 16;

/// Encrypt plaintext under `key`, returning the combined form
pub fn seal(key: &MasterKey, plaintext: &[u8]) -> VaultResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.expose())
        .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;

    let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    combined.extend_from_slice(&nonce_bytes);
    combined.extend_from_slice(&ciphertext);
    Ok(combined)
}

/// Decrypt the combined form under `key`.
///
/// A tampered payload or a key derived from a different password fails the
/// tag check and never yields plaintext.
pub fn open(key: &MasterKey, combined: &[u8]) -> VaultResult<Vec<u8>> {
    if combined.len() < NONCE_LEN + TAG_LEN {
        return Err(VaultError::DecryptionFailed("data too short".into()));
    }

    let cipher = Aes256Gcm::new_from_slice(key.expose())
        .map_err(|e| VaultError::DecryptionFailed(e.to_string()))?;

    let nonce = Nonce::from_slice(&combined[..NONCE_LEN]);

    cipher
        .decrypt(nonce, &combined[NONCE_LEN..])
        .map_err(|_| VaultError::DecryptionFailed("authentication failed".into()))
}
