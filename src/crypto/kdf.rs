//! QuickVault Core - Key Derivation
//!
//! PBKDF2-HMAC-SHA256 password stretching and the in-memory master key.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use secrecy::{ExposeSecret, Secret};
use sha2::{Digest, Sha256};
use zeroize::ZeroizeOnDrop;

use crate::error::{VaultError, VaultResult};

/// Key length for AES-256
pub const KEY_LEN: usize = 32;

/// Salt length (one salt per account, generated at setup)
pub const SALT_LEN: usize = 32;

/// PBKDF2 iteration count. Frozen: changing it would orphan every key ever
/// derived from a stored salt.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// The derived master key, resident in memory only while unlocked
#[derive(Clone, ZeroizeOnDrop)]
pub struct MasterKey {
    #[zeroize(skip)]
    inner: Secret<[u8; KEY_LEN]>,
}

impl MasterKey {
    /// Create a master key from raw bytes
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            inner: Secret::new(bytes),
        }
    }

    /// Expose the key bytes (use with caution)
    pub fn expose(&self) -> &[u8; KEY_LEN] {
        self.inner.expose_secret()
    }

    /// Generate a random key
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::new(bytes)
    }
}

/// Derive the master key from (password, salt) with PBKDF2-HMAC-SHA256.
///
/// Deterministic: identical inputs always yield the identical key. Both the
/// password-change re-encryption pass and second-device unlock depend on
/// this.
pub fn derive_key(password: &str, salt: &[u8]) -> VaultResult<MasterKey> {
    if salt.is_empty() {
        return Err(VaultError::KeyDerivationFailed("empty salt".into()));
    }

    let mut okm = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut okm);
    Ok(MasterKey::new(okm))
}

/// SHA-256 hex digest of the master password.
///
/// Fast-equality verifier only - never used as key material.
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    hex::encode(digest)
}

/// Generate a random per-account salt
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_deterministic() {
        let salt = [7u8; SALT_LEN];

        let k1 = derive_key("correct horse", &salt).unwrap();
        let k2 = derive_key("correct horse", &salt).unwrap();

        assert_eq!(k1.expose(), k2.expose());
    }

    #[test]
    fn test_different_password_different_key() {
        let salt = [7u8; SALT_LEN];

        let k1 = derive_key("password-one", &salt).unwrap();
        let k2 = derive_key("password-two", &salt).unwrap();

        assert_ne!(k1.expose(), k2.expose());
    }

    #[test]
    fn test_different_salt_different_key() {
        let k1 = derive_key("same password", &[1u8; SALT_LEN]).unwrap();
        let k2 = derive_key("same password", &[2u8; SALT_LEN]).unwrap();

        assert_ne!(k1.expose(), k2.expose());
    }

    #[test]
    fn test_empty_salt_rejected() {
        let result = derive_key("some password", &[]);
        assert!(matches!(result, Err(VaultError::KeyDerivationFailed(_))));
    }

    #[test]
    fn test_hash_password_hex() {
        let hash = hash_password("password");

        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
    }

    #[test]
    fn test_generate_salt_random() {
        let s1 = generate_salt();
        let s2 = generate_salt();

        assert_eq!(s1.len(), SALT_LEN);
        assert_ne!(s1, s2);
    }
}
