//! QuickVault Core - Secret Storage
//!
//! Keychain-style persistence for small secrets keyed by logical name.
//! Each secret is either local-only (password hash, biometric secret) or
//! synchronizable (the account salt, propagated to the user's other devices
//! by the platform's encrypted secret sync). Lookups match either attribute,
//! since a secret written on another device arrives with the synchronizable
//! flag already set.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{VaultError, VaultResult};

/// Secret name for the per-account salt
pub const SALT_SECRET: &str = "crypto.salt";

/// Generic secret persistence, the shape of a platform keychain
pub trait SecretStore: Send + Sync {
    /// Save a secret, overwriting any previous value under the name
    fn save(&self, name: &str, data: &[u8], synchronizable: bool) -> VaultResult<()>;

    /// Load a secret regardless of its synchronizable attribute
    fn load(&self, name: &str) -> VaultResult<Vec<u8>>;

    /// Delete a secret. Deleting an absent secret is not an error.
    fn delete(&self, name: &str) -> VaultResult<()>;

    /// Check presence regardless of the synchronizable attribute
    fn exists(&self, name: &str) -> bool;
}

// ═══════════════════════════════════════════════════════════════════════════
// File-backed store
// ═══════════════════════════════════════════════════════════════════════════

/// Secret store backed by files under `<root>/{local,synced}/<name>`.
///
/// The two subdirectories model the platform keychain's local-only vs.
/// synchronizable item attribute. Writes go through a temp file and rename.
pub struct FileSecretStore {
    root: PathBuf,
}

impl FileSecretStore {
    /// Create a store rooted at the given directory
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, name: &str, synchronizable: bool) -> PathBuf {
        let dir = if synchronizable { "synced" } else { "local" };
        self.root.join(dir).join(name)
    }

    /// Locate a secret under either attribute, synced copy first
    fn find(&self, name: &str) -> Option<PathBuf> {
        for synchronizable in [true, false] {
            let path = self.path_for(name, synchronizable);
            if path.exists() {
                return Some(path);
            }
        }
        None
    }

    fn write_atomic(path: &Path, data: &[u8]) -> VaultResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Secret names contain dots, so append rather than swap an extension
        let mut temp_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        temp_name.push(".tmp");
        let temp_path = path.with_file_name(temp_name);

        let mut file = fs::File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;

        fs::rename(&temp_path, path)?;
        Ok(())
    }
}

impl SecretStore for FileSecretStore {
    fn save(&self, name: &str, data: &[u8], synchronizable: bool) -> VaultResult<()> {
        // Overwrite = delete both copies, then insert under the new attribute
        self.delete(name)?;
        Self::write_atomic(&self.path_for(name, synchronizable), data)
    }

    fn load(&self, name: &str) -> VaultResult<Vec<u8>> {
        let path = self
            .find(name)
            .ok_or_else(|| VaultError::SecretNotFound(name.to_string()))?;

        fs::read(&path).map_err(|e| VaultError::SecretStore(e.to_string()))
    }

    fn delete(&self, name: &str) -> VaultResult<()> {
        for synchronizable in [true, false] {
            let path = self.path_for(name, synchronizable);
            if path.exists() {
                fs::remove_file(&path).map_err(|e| VaultError::SecretStore(e.to_string()))?;
            }
        }
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.find(name).is_some()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// In-memory store
// ═══════════════════════════════════════════════════════════════════════════

struct SecretItem {
    data: Vec<u8>,
    synchronizable: bool,
}

/// In-memory secret store for tests and embedders
#[derive(Default)]
pub struct MemorySecretStore {
    items: Mutex<HashMap<String, SecretItem>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The synchronizable attribute currently stored for a secret
    pub fn is_synchronizable(&self, name: &str) -> Option<bool> {
        self.items.lock().get(name).map(|item| item.synchronizable)
    }
}

impl SecretStore for MemorySecretStore {
    fn save(&self, name: &str, data: &[u8], synchronizable: bool) -> VaultResult<()> {
        self.items.lock().insert(
            name.to_string(),
            SecretItem {
                data: data.to_vec(),
                synchronizable,
            },
        );
        Ok(())
    }

    fn load(&self, name: &str) -> VaultResult<Vec<u8>> {
        self.items
            .lock()
            .get(name)
            .map(|item| item.data.clone())
            .ok_or_else(|| VaultError::SecretNotFound(name.to_string()))
    }

    fn delete(&self, name: &str) -> VaultResult<()> {
        self.items.lock().remove(name);
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.items.lock().contains_key(name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Salt accessor
// ═══════════════════════════════════════════════════════════════════════════

/// Fixed-name accessor for the per-account salt.
///
/// The salt is stored synchronizable so a second device derives the same key
/// from the same password. It must never be regenerated while records exist:
/// ciphertext written under the old salt would become permanently unreadable.
#[derive(Clone)]
pub struct SaltStore {
    store: Arc<dyn SecretStore>,
}

impl SaltStore {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    pub fn exists(&self) -> bool {
        self.store.exists(SALT_SECRET)
    }

    pub fn load(&self) -> VaultResult<Vec<u8>> {
        self.store.load(SALT_SECRET)
    }

    pub fn save(&self, salt: &[u8]) -> VaultResult<()> {
        self.store.save(SALT_SECRET, salt, true)
    }

    /// Re-save a salt that may predate cross-device sync with the
    /// synchronizable attribute set. Idempotent.
    pub fn migrate_to_synchronizable(&self, salt: &[u8]) -> VaultResult<()> {
        self.store.delete(SALT_SECRET)?;
        self.store.save(SALT_SECRET, salt, true)
    }

    pub fn delete(&self) -> VaultResult<()> {
        self.store.delete(SALT_SECRET)
    }
}
