//! QuickVault Core - Biometric Gate
//!
//! The OS biometric prompt, abstracted. The core only needs "is it
//! available" and "did the user pass"; Face vs. fingerprint, enrollment and
//! the OS lockout UI all belong to the platform layer.

use crate::error::VaultResult;

/// Device biometric prompt
pub trait BiometricGate: Send + Sync {
    /// Whether the device can evaluate a biometric check at all
    fn is_available(&self) -> bool;

    /// Show the platform prompt.
    ///
    /// `Ok(false)` means the user failed or cancelled the check; `Err` means
    /// the platform itself failed. Callers treat both as a rejected unlock.
    fn prompt(&self, reason: &str) -> VaultResult<bool>;
}

/// Gate for platforms without biometric hardware
pub struct UnavailableGate;

impl BiometricGate for UnavailableGate {
    fn is_available(&self) -> bool {
        false
    }

    fn prompt(&self, _reason: &str) -> VaultResult<bool> {
        Ok(false)
    }
}

/// Scripted gate for tests and demos
pub struct StaticGate {
    pub available: bool,
    pub outcome: bool,
}

impl StaticGate {
    /// A gate that approves every prompt
    pub fn approving() -> Self {
        Self {
            available: true,
            outcome: true,
        }
    }

    /// A gate that rejects every prompt
    pub fn rejecting() -> Self {
        Self {
            available: true,
            outcome: false,
        }
    }
}

impl BiometricGate for StaticGate {
    fn is_available(&self) -> bool {
        self.available
    }

    fn prompt(&self, _reason: &str) -> VaultResult<bool> {
        Ok(self.outcome)
    }
}
