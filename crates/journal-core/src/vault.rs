//! Optional password gate.
//!
//! The vault is either disabled, enabled with a [`CredentialRecord`], or
//! holding a record that failed to decode. A corrupt record never verifies;
//! the only way out is [`CredentialVault::reset_corrupt`].

use tracing::{debug, info, warn};

use crate::credential::{CredentialRecord, CredentialState};
use crate::crypto::{CryptoError, KdfParams};

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("password protection is already enabled")]
    AlreadyEnabled,
    #[error("password protection is not enabled")]
    NotEnabled,
    #[error("stored password record is corrupt; reset it first")]
    CorruptCredential,
    #[error("stored password record is not corrupt")]
    NotCorrupt,
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Answer to a verification query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// Protection is disabled; there is nothing to check.
    NotRequired,
    Granted,
    Denied,
}

/// Outcome of an operation guarded by the current password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Accepted,
    /// The supplied current password did not verify. Nothing changed.
    Rejected,
}

#[derive(Debug, Clone)]
pub struct CredentialVault {
    state: CredentialState,
    kdf: KdfParams,
}

impl Default for CredentialVault {
    fn default() -> Self {
        Self::new(CredentialState::Disabled)
    }
}

impl CredentialVault {
    pub fn new(state: CredentialState) -> Self {
        Self {
            state,
            kdf: KdfParams::default(),
        }
    }

    /// Overrides the parameters used for records created from now on.
    /// Existing records keep verifying with the parameters they were made with.
    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn state(&self) -> &CredentialState {
        &self.state
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.state, CredentialState::Disabled)
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self.state, CredentialState::Corrupt(_))
    }

    /// `SetPassword`: turns protection on with a freshly salted record.
    pub fn enable_password(&mut self, new_password: &str) -> Result<(), VaultError> {
        match self.state {
            CredentialState::Disabled => {}
            CredentialState::Enabled(_) => return Err(VaultError::AlreadyEnabled),
            CredentialState::Corrupt(_) => return Err(VaultError::CorruptCredential),
        }
        self.install(new_password)?;
        info!("password protection enabled");
        Ok(())
    }

    pub fn change_password(
        &mut self,
        old_password: &str,
        new_password: &str,
    ) -> Result<Attempt, VaultError> {
        if new_password.is_empty() {
            return Err(VaultError::EmptyPassword);
        }
        if self.verify_current(old_password)? == Attempt::Rejected {
            return Ok(Attempt::Rejected);
        }
        self.install(new_password)?;
        info!("password changed");
        Ok(Attempt::Accepted)
    }

    /// `DisablePassword`: turns protection off after checking the current password.
    pub fn remove_password(&mut self, old_password: &str) -> Result<Attempt, VaultError> {
        if self.verify_current(old_password)? == Attempt::Rejected {
            return Ok(Attempt::Rejected);
        }
        self.state = CredentialState::Disabled;
        info!("password protection removed");
        Ok(Attempt::Accepted)
    }

    pub fn verify_password(&self, candidate: &str) -> Result<Verification, VaultError> {
        match &self.state {
            CredentialState::Disabled => Ok(Verification::NotRequired),
            CredentialState::Corrupt(_) => {
                debug!("verification against corrupt credential record denied");
                Ok(Verification::Denied)
            }
            CredentialState::Enabled(record) => {
                if record.matches(candidate)? {
                    Ok(Verification::Granted)
                } else {
                    Ok(Verification::Denied)
                }
            }
        }
    }

    /// Forgets a record that could not be decoded, leaving protection disabled.
    pub fn reset_corrupt(&mut self) -> Result<(), VaultError> {
        let CredentialState::Corrupt(corrupt) = &self.state else {
            return Err(VaultError::NotCorrupt);
        };
        warn!(reason = %corrupt.reason, "discarding corrupt credential record");
        self.state = CredentialState::Disabled;
        Ok(())
    }

    fn verify_current(&self, old_password: &str) -> Result<Attempt, VaultError> {
        match self.verify_password(old_password)? {
            Verification::NotRequired => Err(VaultError::NotEnabled),
            Verification::Denied => Ok(Attempt::Rejected),
            Verification::Granted => Ok(Attempt::Accepted),
        }
    }

    fn install(&mut self, new_password: &str) -> Result<(), VaultError> {
        if new_password.is_empty() {
            return Err(VaultError::EmptyPassword);
        }
        let record = CredentialRecord::derive(new_password, self.kdf)?;
        self.state = CredentialState::Enabled(record);
        Ok(())
    }
}
