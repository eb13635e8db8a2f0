//! QuickVault Core - Authentication
//!
//! The vault's state machine: master-password setup, password and biometric
//! unlock, rate limiting, password change with full re-encryption,
//! destructive wipe, and second-device bootstrap against already-synced
//! ciphertext.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use zeroize::Zeroizing;

use crate::biometrics::BiometricGate;
use crate::crypto::aead;
use crate::crypto::kdf;
use crate::crypto::CryptoEngine;
use crate::error::{VaultError, VaultResult};
use crate::records::RecordStore;
use crate::reencrypt::{self, ReencryptReport};
use crate::secrets::{SecretStore, SALT_SECRET};

// Secret names. All local-only; the salt is the one synchronizable item.
const PASSWORD_HASH_SECRET: &str = "auth.master_password_hash";
const BIOMETRIC_PASSWORD_SECRET: &str = "auth.biometric_password";
const BIOMETRIC_ENABLED_SECRET: &str = "auth.biometric_enabled";
const FAILED_ATTEMPTS_SECRET: &str = "auth.failed_attempts";

/// Authentication state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No master password provisioned on this install
    SetupRequired,
    /// Provisioned, key not resident
    Locked,
    /// Key resident, content services may encrypt/decrypt
    Unlocked,
}

/// Authenticator tunables
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Minimum master password length
    pub min_password_len: usize,
    /// Failed attempts before the rate limit engages
    pub max_failed_attempts: u32,
    /// Cooldown once the limit is reached
    pub rate_limit_duration: Duration,
    /// Poll delays while waiting for the salt to arrive from another device
    pub salt_sync_delays: Vec<Duration>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_password_len: 8,
            max_failed_attempts: 3,
            rate_limit_duration: Duration::from_secs(30),
            salt_sync_delays: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(3),
                Duration::from_secs(4),
            ],
        }
    }
}

/// Persisted failed-attempt counter
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct FailedAttempts {
    count: u32,
    /// Unix timestamp (milliseconds) of the last failure
    last_failure: i64,
}

/// Authentication orchestrator.
///
/// Every state-changing operation runs behind one async mutex, so no record
/// encrypt/decrypt can interleave with the re-encryption pass, whose
/// intermediate state mixes records under two keys.
pub struct Authenticator {
    crypto: Arc<CryptoEngine>,
    secrets: Arc<dyn SecretStore>,
    records: Arc<dyn RecordStore>,
    biometric: Arc<dyn BiometricGate>,
    config: AuthConfig,
    state_tx: watch::Sender<AuthState>,
    op_lock: Mutex<()>,
}

impl Authenticator {
    pub fn new(
        crypto: Arc<CryptoEngine>,
        secrets: Arc<dyn SecretStore>,
        records: Arc<dyn RecordStore>,
        biometric: Arc<dyn BiometricGate>,
        config: AuthConfig,
    ) -> Self {
        let initial = Self::initial_state(&crypto, &*secrets, &*records);
        let (state_tx, _) = watch::channel(initial);

        Self {
            crypto,
            secrets,
            records,
            biometric,
            config,
            state_tx,
            op_lock: Mutex::new(()),
        }
    }

    fn initial_state(
        crypto: &CryptoEngine,
        secrets: &dyn SecretStore,
        records: &dyn RecordStore,
    ) -> AuthState {
        if !secrets.exists(PASSWORD_HASH_SECRET) {
            return AuthState::SetupRequired;
        }

        // A hash with no salt and no records is a leftover from an
        // interrupted setup or wipe; treat the install as fresh.
        if !crypto.has_salt() && records.count().unwrap_or(0) == 0 {
            log::warn!("orphaned password hash detected, resetting to setup");
            let _ = secrets.delete(PASSWORD_HASH_SECRET);
            let _ = secrets.delete(BIOMETRIC_PASSWORD_SECRET);
            return AuthState::SetupRequired;
        }

        AuthState::Locked
    }

    // ═══════════════════════════════════════════════════════════════════════
    // STATE
    // ═══════════════════════════════════════════════════════════════════════

    /// Current authentication state
    pub fn state(&self) -> AuthState {
        *self.state_tx.borrow()
    }

    pub fn is_locked(&self) -> bool {
        self.state() != AuthState::Unlocked
    }

    /// Watch channel for state transitions (the UI's lock-screen driver)
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: AuthState) {
        log::info!("auth state -> {:?}", state);
        self.state_tx.send_replace(state);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SETUP
    // ═══════════════════════════════════════════════════════════════════════

    /// Provision the master password on this install.
    ///
    /// When records from another device have already synced in, the password
    /// is validated against their ciphertext first; accepting a mismatched
    /// password here would mint a second, incompatible salt for the same
    /// account.
    pub async fn setup_master_password(&self, password: &str) -> VaultResult<()> {
        let _guard = self.op_lock.lock().await;
        self.require_min_length(password)?;

        let has_existing = self.has_existing_cloud_data();
        if has_existing {
            log::info!("records already synced from another device, validating password");
            self.wait_for_salt_sync().await?;
            if !self.validate_password_with_existing_data(password) {
                return Err(VaultError::PasswordMismatchWithExistingData);
            }
        }

        let hash = kdf::hash_password(password);
        self.secrets
            .save(PASSWORD_HASH_SECRET, hash.as_bytes(), false)?;

        self.crypto.initialize_key(password, None, !has_existing)?;

        self.store_biometric_password(password);
        self.reset_failed_attempts();
        self.set_state(AuthState::Unlocked);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // UNLOCK
    // ═══════════════════════════════════════════════════════════════════════

    /// Unlock with the master password
    pub async fn authenticate_with_password(&self, password: &str) -> VaultResult<()> {
        let _guard = self.op_lock.lock().await;
        self.check_rate_limit()?;

        if !self.secrets.exists(PASSWORD_HASH_SECRET) {
            return Err(VaultError::NoPasswordSet);
        }
        let stored_hash = self.load_password_hash()?;

        if kdf::hash_password(password) == stored_hash {
            self.crypto.initialize_key(password, None, false)?;
            self.reset_failed_attempts();
            self.store_biometric_password(password);
            self.set_state(AuthState::Unlocked);
            Ok(())
        } else {
            self.record_failed_attempt();
            Err(VaultError::PasswordIncorrect)
        }
    }

    /// Unlock with the device biometric.
    ///
    /// Biometric unlock replays the password stored at the last successful
    /// password login, so the derived key is identical to a password unlock.
    pub async fn authenticate_with_biometric(&self) -> VaultResult<()> {
        let _guard = self.op_lock.lock().await;

        if !self.is_biometric_enabled() {
            return Err(VaultError::BiometricNotAvailable);
        }
        if !self.biometric.is_available() {
            return Err(VaultError::BiometricNotAvailable);
        }

        let passed = self
            .biometric
            .prompt("Unlock your vault")
            .map_err(|_| VaultError::BiometricFailed)?;
        if !passed {
            return Err(VaultError::BiometricFailed);
        }

        let password_bytes = match self.secrets.load(BIOMETRIC_PASSWORD_SECRET) {
            Ok(bytes) => bytes,
            Err(_) => return Err(VaultError::BiometricPasswordNotStored),
        };
        let password = Zeroizing::new(
            String::from_utf8(password_bytes)
                .map_err(|_| VaultError::BiometricPasswordNotStored)?,
        );

        self.crypto.initialize_key(password.as_str(), None, false)?;
        self.set_state(AuthState::Unlocked);
        Ok(())
    }

    /// Drop the resident key and lock the vault. Never fails.
    pub fn lock(&self) {
        self.crypto.clear_key();
        if self.state() != AuthState::SetupRequired {
            self.set_state(AuthState::Locked);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // PASSWORD CHANGE
    // ═══════════════════════════════════════════════════════════════════════

    /// Change the master password, re-encrypting every stored record.
    ///
    /// Order matters: all content is converted first, credentials move last.
    /// If the pass fails at any point, no credential has changed and the old
    /// password still opens everything.
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> VaultResult<ReencryptReport> {
        let _guard = self.op_lock.lock().await;

        if !self.secrets.exists(PASSWORD_HASH_SECRET) {
            return Err(VaultError::NoPasswordSet);
        }
        if kdf::hash_password(old_password) != self.load_password_hash()? {
            return Err(VaultError::PasswordIncorrect);
        }
        self.require_min_length(new_password)?;

        // Same salt for both keys: only the password changes, so only the
        // derived key changes. Regenerating the salt would buy nothing and
        // add one more thing that can fail mid-pass.
        let salt = self.crypto.get_salt()?;
        let old_key = kdf::derive_key(old_password, &salt)?;
        let new_key = kdf::derive_key(new_password, &salt)?;

        let report = reencrypt::reencrypt_all(&*self.records, &old_key, &new_key)?;

        self.crypto.initialize_key(new_password, Some(&salt), false)?;
        let new_hash = kdf::hash_password(new_password);
        self.secrets
            .save(PASSWORD_HASH_SECRET, new_hash.as_bytes(), false)?;
        self.store_biometric_password(new_password);

        log::info!("password changed, {} blobs re-encrypted", report.blobs);
        Ok(report)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // WIPE
    // ═══════════════════════════════════════════════════════════════════════

    /// Destructive wipe of all records and credentials.
    ///
    /// Content goes first, credentials second: an interruption between the
    /// two leaves a locked-out install, never live credentials over orphaned
    /// ciphertext.
    pub async fn clear_all_data(&self, password: &str) -> VaultResult<()> {
        let _guard = self.op_lock.lock().await;

        if !self.secrets.exists(PASSWORD_HASH_SECRET) {
            return Err(VaultError::NoPasswordSet);
        }
        if kdf::hash_password(password) != self.load_password_hash()? {
            return Err(VaultError::PasswordIncorrect);
        }

        log::warn!("wiping all vault data");

        // Backing files are best-effort; a missing file must not stop the wipe
        if let Ok(handles) = self.records.fetch_all() {
            for handle in &handles {
                for path in &handle.files {
                    if let Err(e) = self.records.delete_file(path) {
                        log::warn!("could not delete {}: {}", path.display(), e);
                    }
                }
            }
        }
        self.records.delete_all()?;

        self.secrets.delete(PASSWORD_HASH_SECRET)?;
        self.secrets.delete(BIOMETRIC_PASSWORD_SECRET)?;
        self.secrets.delete(SALT_SECRET)?;

        self.crypto.clear_key();

        self.secrets.delete(FAILED_ATTEMPTS_SECRET)?;
        self.secrets.delete(BIOMETRIC_ENABLED_SECRET)?;

        self.set_state(AuthState::SetupRequired);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // MULTI-DEVICE
    // ═══════════════════════════════════════════════════════════════════════

    /// Whether any record exists, synced or local
    pub fn has_existing_cloud_data(&self) -> bool {
        self.records.count().map(|count| count > 0).unwrap_or(false)
    }

    /// Best-effort check that `password` matches the account the synced
    /// records were written by: derive a trial key from the synced salt and
    /// try to open one sampled record. A store with nothing to sample cannot
    /// contradict the password and counts as a match. This is a heuristic,
    /// not a proof.
    pub fn validate_password_with_existing_data(&self, password: &str) -> bool {
        if !self.has_existing_cloud_data() {
            return true;
        }

        let salt = match self.crypto.get_salt() {
            Ok(salt) => salt,
            Err(_) => {
                log::warn!("salt not yet synced, cannot validate password");
                return false;
            }
        };
        let trial_key = match kdf::derive_key(password, &salt) {
            Ok(key) => key,
            Err(_) => return false,
        };

        let handles = match self.records.fetch_all() {
            Ok(handles) => handles,
            Err(_) => return false,
        };
        let sample = match handles.into_iter().next() {
            Some(handle) => handle,
            None => return true,
        };
        let field = match sample.fields.first() {
            Some(field) => *field,
            None => return true, // record with no content to test
        };

        match self.records.read_ciphertext(sample.id, field) {
            Ok(ciphertext) => aead::open(&trial_key, &ciphertext).is_ok(),
            Err(_) => true, // vanished mid-check: nothing to contradict
        }
    }

    /// Wait for the synchronizable salt to arrive from the user's other
    /// device. Polls with increasing delays rather than one fixed sleep;
    /// sync latency is outside our control, so this stays a heuristic with
    /// a timeout.
    pub async fn wait_for_salt_sync(&self) -> VaultResult<()> {
        if self.crypto.has_salt() {
            return Ok(());
        }

        for (attempt, delay) in self.config.salt_sync_delays.iter().enumerate() {
            tokio::time::sleep(*delay).await;
            if self.crypto.has_salt() {
                log::info!("salt arrived after {} poll(s)", attempt + 1);
                return Ok(());
            }
        }

        log::warn!("salt did not sync within the poll window");
        Err(VaultError::SaltSyncTimeout)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // BIOMETRIC MANAGEMENT
    // ═══════════════════════════════════════════════════════════════════════

    pub fn is_biometric_available(&self) -> bool {
        self.biometric.is_available()
    }

    /// Enable or disable biometric unlock. Disabling removes the stored
    /// unlock secret.
    pub fn enable_biometric(&self, enabled: bool) -> VaultResult<()> {
        if enabled {
            self.secrets.save(BIOMETRIC_ENABLED_SECRET, b"1", false)?;
        } else {
            self.secrets.delete(BIOMETRIC_ENABLED_SECRET)?;
            self.secrets.delete(BIOMETRIC_PASSWORD_SECRET)?;
        }
        Ok(())
    }

    pub fn is_biometric_enabled(&self) -> bool {
        self.secrets.exists(BIOMETRIC_ENABLED_SECRET)
    }

    // The stored password lets biometric unlock re-derive the same key
    // without a retype. Failure here only degrades biometric unlock, so it
    // logs instead of failing the auth that just succeeded.
    fn store_biometric_password(&self, password: &str) {
        if let Err(e) = self
            .secrets
            .save(BIOMETRIC_PASSWORD_SECRET, password.as_bytes(), false)
        {
            log::warn!("could not store biometric unlock secret: {}", e);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // RATE LIMITING
    // ═══════════════════════════════════════════════════════════════════════

    fn check_rate_limit(&self) -> VaultResult<()> {
        let attempts = self.load_failed_attempts();
        if attempts.count < self.config.max_failed_attempts {
            return Ok(());
        }

        let elapsed = Utc::now().timestamp_millis() - attempts.last_failure;
        let window = self.config.rate_limit_duration.as_millis() as i64;

        if elapsed < window {
            let remaining_seconds = (((window - elapsed) + 999) / 1000).max(1) as u32;
            return Err(VaultError::RateLimited { remaining_seconds });
        }

        // Cooldown elapsed; the next failure starts a fresh count
        self.reset_failed_attempts();
        Ok(())
    }

    fn record_failed_attempt(&self) {
        let mut attempts = self.load_failed_attempts();
        attempts.count += 1;
        attempts.last_failure = Utc::now().timestamp_millis();
        self.save_failed_attempts(attempts);
        log::warn!("failed unlock attempt #{}", attempts.count);
    }

    fn reset_failed_attempts(&self) {
        self.save_failed_attempts(FailedAttempts::default());
    }

    fn load_failed_attempts(&self) -> FailedAttempts {
        match self.secrets.load(FAILED_ATTEMPTS_SECRET) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(_) => FailedAttempts::default(),
        }
    }

    fn save_failed_attempts(&self, attempts: FailedAttempts) {
        match serde_json::to_vec(&attempts) {
            Ok(bytes) => {
                if let Err(e) = self.secrets.save(FAILED_ATTEMPTS_SECRET, &bytes, false) {
                    log::warn!("could not persist failed-attempt counter: {}", e);
                }
            }
            Err(e) => log::warn!("could not encode failed-attempt counter: {}", e),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CONTENT PASSTHROUGHS
    // ═══════════════════════════════════════════════════════════════════════

    // Content services seal and open records through these, behind the same
    // lock as the re-encryption pass: mid-pass the store mixes records under
    // two keys while the resident key is still the old one.

    pub async fn encrypt(&self, plaintext: &str) -> VaultResult<Vec<u8>> {
        let _guard = self.op_lock.lock().await;
        self.crypto.encrypt(plaintext)
    }

    pub async fn decrypt(&self, data: &[u8]) -> VaultResult<String> {
        let _guard = self.op_lock.lock().await;
        self.crypto.decrypt(data)
    }

    pub async fn encrypt_file(&self, data: &[u8]) -> VaultResult<Vec<u8>> {
        let _guard = self.op_lock.lock().await;
        self.crypto.encrypt_file(data)
    }

    pub async fn decrypt_file(&self, data: &[u8]) -> VaultResult<Vec<u8>> {
        let _guard = self.op_lock.lock().await;
        self.crypto.decrypt_file(data)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // HELPERS
    // ═══════════════════════════════════════════════════════════════════════

    fn require_min_length(&self, password: &str) -> VaultResult<()> {
        if password.chars().count() < self.config.min_password_len {
            return Err(VaultError::PasswordTooShort {
                minimum: self.config.min_password_len,
            });
        }
        Ok(())
    }

    fn load_password_hash(&self) -> VaultResult<String> {
        let bytes = self.secrets.load(PASSWORD_HASH_SECRET)?;
        String::from_utf8(bytes)
            .map_err(|_| VaultError::SecretStore("stored password hash is not utf-8".into()))
    }
}
