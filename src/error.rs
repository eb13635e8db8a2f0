//! QuickVault Core - Error Types

use thiserror::Error;

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Vault error types
#[derive(Error, Debug)]
pub enum VaultError {
    // ═══════════════════════════════════════════════════════════════
    // AUTHENTICATION ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Password must be at least {minimum} characters")]
    PasswordTooShort { minimum: usize },

    #[error("Incorrect password")]
    PasswordIncorrect,

    #[error("Password does not match the data synced from your other device")]
    PasswordMismatchWithExistingData,

    #[error("No master password set")]
    NoPasswordSet,

    #[error("Too many failed attempts - retry in {remaining_seconds} seconds")]
    RateLimited { remaining_seconds: u32 },

    #[error("Biometric unlock is not available")]
    BiometricNotAvailable,

    #[error("Biometric authentication failed")]
    BiometricFailed,

    #[error("Biometric unlock requires a password login first")]
    BiometricPasswordNotStored,

    #[error("Timed out waiting for the account salt to sync from another device")]
    SaltSyncTimeout,

    // ═══════════════════════════════════════════════════════════════
    // CRYPTO ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Encryption key not available")]
    KeyNotAvailable,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // ═══════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Secret not found: {0}")]
    SecretNotFound(String),

    #[error("Secret store error: {0}")]
    SecretStore(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl VaultError {
    /// Check if this is a security-critical error
    pub fn is_security_critical(&self) -> bool {
        matches!(
            self,
            VaultError::DecryptionFailed(_)
                | VaultError::RateLimited { .. }
                | VaultError::PasswordMismatchWithExistingData
        )
    }

    /// Check if this error rejects an authentication attempt (as opposed to
    /// reporting a fault in the core itself)
    pub fn is_auth_rejection(&self) -> bool {
        matches!(
            self,
            VaultError::PasswordIncorrect
                | VaultError::PasswordMismatchWithExistingData
                | VaultError::BiometricFailed
                | VaultError::RateLimited { .. }
        )
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        VaultError::Serialization(e.to_string())
    }
}
