//! QuickVault Core - Cryptography
//!
//! PBKDF2 key derivation, AES-256-GCM sealing, and the resident-key engine.

pub mod aead;
pub mod engine;
pub mod kdf;

pub use aead::{open, seal, NONCE_LEN, TAG_LEN};
pub use engine::CryptoEngine;
pub use kdf::{
    derive_key, generate_salt, hash_password, MasterKey, KEY_LEN, PBKDF2_ITERATIONS, SALT_LEN,
};
