//! QuickVault Core - Crypto Engine
//!
//! Owns the single resident master key and the encrypt/decrypt surface used
//! by every content service. The key exists only in memory while the vault
//! is unlocked; locking drops and zeroizes it.

use std::sync::Arc;

use parking_lot::RwLock;

use super::aead;
use super::kdf::{self, MasterKey};
use crate::error::{VaultError, VaultResult};
use crate::secrets::{SaltStore, SecretStore};

/// Resident-key slot plus salt management.
///
/// One instance per process, shared by reference with whatever services need
/// to seal or open record content. All key installs and clears go through
/// here.
pub struct CryptoEngine {
    key: RwLock<Option<MasterKey>>,
    salts: SaltStore,
}

impl CryptoEngine {
    pub fn new(secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            key: RwLock::new(None),
            salts: SaltStore::new(secrets),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // KEY MANAGEMENT
    // ═══════════════════════════════════════════════════════════════════════

    /// Derive and install the resident key.
    ///
    /// Salt resolution order: explicit argument, then the stored salt, then a
    /// freshly generated one when `allow_salt_generation` is set. With no
    /// salt available the account is unprovisioned and the call fails with
    /// `KeyNotAvailable`.
    pub fn initialize_key(
        &self,
        password: &str,
        salt: Option<&[u8]>,
        allow_salt_generation: bool,
    ) -> VaultResult<()> {
        let salt_bytes: Vec<u8> = if let Some(explicit) = salt {
            explicit.to_vec()
        } else if self.salts.exists() {
            let stored = self.salts.load()?;
            // Salts written before cross-device sync shipped are local-only;
            // re-save so the user's other devices receive them.
            self.salts.migrate_to_synchronizable(&stored)?;
            stored
        } else if allow_salt_generation {
            let fresh = kdf::generate_salt();
            self.salts.save(&fresh)?;
            log::info!("generated new account salt");
            fresh.to_vec()
        } else {
            return Err(VaultError::KeyNotAvailable);
        };

        let key = kdf::derive_key(password, &salt_bytes)?;
        *self.key.write() = Some(key);
        log::debug!("resident key initialized");
        Ok(())
    }

    /// Drop the resident key. Idempotent; the key zeroizes on drop.
    pub fn clear_key(&self) {
        *self.key.write() = None;
        log::debug!("resident key cleared");
    }

    /// Whether a key is currently resident
    pub fn has_key(&self) -> bool {
        self.key.read().is_some()
    }

    /// The stored account salt.
    ///
    /// Fails with `KeyNotAvailable` when absent - callers use this as the
    /// "is this account provisioned at all" probe.
    pub fn get_salt(&self) -> VaultResult<Vec<u8>> {
        if !self.salts.exists() {
            return Err(VaultError::KeyNotAvailable);
        }
        self.salts.load()
    }

    /// Whether a salt is stored (locally or synced in)
    pub fn has_salt(&self) -> bool {
        self.salts.exists()
    }

    /// SHA-256 hex verifier for the master password
    pub fn hash_password(&self, password: &str) -> String {
        kdf::hash_password(password)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ENCRYPT / DECRYPT
    // ═══════════════════════════════════════════════════════════════════════

    /// Encrypt a text value under the resident key
    pub fn encrypt(&self, plaintext: &str) -> VaultResult<Vec<u8>> {
        let guard = self.key.read();
        let key = guard.as_ref().ok_or(VaultError::KeyNotAvailable)?;
        aead::seal(key, plaintext.as_bytes())
    }

    /// Decrypt a text value under the resident key
    pub fn decrypt(&self, data: &[u8]) -> VaultResult<String> {
        let guard = self.key.read();
        let key = guard.as_ref().ok_or(VaultError::KeyNotAvailable)?;
        let plaintext = aead::open(key, data)?;
        String::from_utf8(plaintext)
            .map_err(|_| VaultError::DecryptionFailed("invalid utf-8".into()))
    }

    /// Encrypt a binary payload under the resident key
    pub fn encrypt_file(&self, data: &[u8]) -> VaultResult<Vec<u8>> {
        let guard = self.key.read();
        let key = guard.as_ref().ok_or(VaultError::KeyNotAvailable)?;
        aead::seal(key, data)
    }

    /// Decrypt a binary payload under the resident key
    pub fn decrypt_file(&self, data: &[u8]) -> VaultResult<Vec<u8>> {
        let guard = self.key.read();
        let key = guard.as_ref().ok_or(VaultError::KeyNotAvailable)?;
        aead::open(key, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::{MemorySecretStore, SALT_SECRET};

    fn engine_with_store() -> (CryptoEngine, Arc<MemorySecretStore>) {
        let store = Arc::new(MemorySecretStore::new());
        let engine = CryptoEngine::new(store.clone());
        (engine, store)
    }

    #[test]
    fn test_encrypt_without_key_fails() {
        let (engine, _) = engine_with_store();

        assert!(matches!(
            engine.encrypt("data"),
            Err(VaultError::KeyNotAvailable)
        ));
        assert!(matches!(
            engine.decrypt(&[0u8; 64]),
            Err(VaultError::KeyNotAvailable)
        ));
    }

    #[test]
    fn test_initialize_generates_salt_once() {
        let (engine, _) = engine_with_store();

        engine.initialize_key("longenough1", None, true).unwrap();
        let salt1 = engine.get_salt().unwrap();
        assert_eq!(salt1.len(), kdf::SALT_LEN);

        // Re-initializing reuses the stored salt
        engine.initialize_key("longenough1", None, true).unwrap();
        assert_eq!(engine.get_salt().unwrap(), salt1);
    }

    #[test]
    fn test_initialize_without_salt_fails_when_not_allowed() {
        let (engine, _) = engine_with_store();

        let result = engine.initialize_key("longenough1", None, false);
        assert!(matches!(result, Err(VaultError::KeyNotAvailable)));
        assert!(!engine.has_key());
    }

    #[test]
    fn test_string_roundtrip() {
        let (engine, _) = engine_with_store();
        engine.initialize_key("longenough1", None, true).unwrap();

        let sealed = engine.encrypt("card 4111 1111 1111 1111").unwrap();
        assert_eq!(engine.decrypt(&sealed).unwrap(), "card 4111 1111 1111 1111");
    }

    #[test]
    fn test_file_roundtrip() {
        let (engine, _) = engine_with_store();
        engine.initialize_key("longenough1", None, true).unwrap();

        let payload = vec![0xAB; 4096];
        let sealed = engine.encrypt_file(&payload).unwrap();
        assert_eq!(engine.decrypt_file(&sealed).unwrap(), payload);
    }

    #[test]
    fn test_wrong_password_rejected_by_tag() {
        let (engine, _) = engine_with_store();
        engine.initialize_key("first password", None, true).unwrap();
        let sealed = engine.encrypt("secret").unwrap();

        engine.initialize_key("other password", None, false).unwrap();
        assert!(matches!(
            engine.decrypt(&sealed),
            Err(VaultError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_clear_key_idempotent() {
        let (engine, _) = engine_with_store();
        engine.initialize_key("longenough1", None, true).unwrap();
        assert!(engine.has_key());

        engine.clear_key();
        assert!(!engine.has_key());
        engine.clear_key();

        assert!(matches!(
            engine.encrypt("data"),
            Err(VaultError::KeyNotAvailable)
        ));
    }

    #[test]
    fn test_get_salt_absent_is_unprovisioned() {
        let (engine, _) = engine_with_store();
        assert!(matches!(engine.get_salt(), Err(VaultError::KeyNotAvailable)));
    }

    #[test]
    fn test_legacy_salt_migrated_to_synchronizable() {
        let (engine, store) = engine_with_store();
        store.save(SALT_SECRET, &[9u8; kdf::SALT_LEN], false).unwrap();

        engine.initialize_key("longenough1", None, false).unwrap();

        assert_eq!(store.is_synchronizable(SALT_SECRET), Some(true));
        assert_eq!(engine.get_salt().unwrap(), vec![9u8; kdf::SALT_LEN]);
    }
}
