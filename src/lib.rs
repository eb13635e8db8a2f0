//! # QuickVault Core
//!
//! Authentication and encryption engine for the QuickVault personal data
//! vault. Everything sensitive the vault stores - ID cards, passports, bank
//! cards - is an opaque AES-256-GCM blob to the rest of the app; this crate
//! owns the master key that seals those blobs and every path that can mint,
//! rotate, or destroy it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     QUICKVAULT CORE                      │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────┐   │
//! │  │ BIOMETRIC   │  │ AUTHENTICATOR│  │ RE-ENCRYPTION  │   │
//! │  │ GATE        │  │ state machine│  │ PASS           │   │
//! │  └──────┬──────┘  └──────┬───────┘  └───────┬────────┘   │
//! │         │                │                  │            │
//! │  ┌──────┴────────────────┴──────────────────┴─────────┐  │
//! │  │                   CRYPTO ENGINE                    │  │
//! │  │       PBKDF2(password, salt) → resident key        │  │
//! │  │             AES-256-GCM seal / open                │  │
//! │  └──────────────────────┬─────────────────────────────┘  │
//! │                         │                                │
//! │  ┌─────────────┐  ┌─────┴────────┐                       │
//! │  │ SECRET      │  │ RECORD       │                       │
//! │  │ STORE       │  │ STORE        │                       │
//! │  │ salt · hash │  │ opaque blobs │                       │
//! │  └─────────────┘  └──────────────┘                       │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Model
//!
//! - Master key derived with PBKDF2-HMAC-SHA256 (100k iterations), resident
//!   in memory only while unlocked, zeroized on lock
//! - Every record sealed with AES-256-GCM in combined form (nonce ‖ ct ‖ tag)
//! - Password verifier is an independent SHA-256 digest, never key material
//! - Salt syncs across devices; password hash and biometric secret never do
//! - Password change re-encrypts every record before any credential moves
//! - 3 failed unlocks trigger a 30-second cooldown

pub mod auth;
pub mod biometrics;
pub mod crypto;
pub mod error;
pub mod records;
pub mod reencrypt;
pub mod secrets;

pub use auth::{AuthConfig, AuthState, Authenticator};
pub use biometrics::BiometricGate;
pub use crypto::{CryptoEngine, MasterKey};
pub use error::{VaultError, VaultResult};
pub use records::{RecordField, RecordHandle, RecordId, RecordStore};
pub use reencrypt::ReencryptReport;
pub use secrets::SecretStore;

/// QuickVault Core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
