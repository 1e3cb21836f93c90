//! Credential record: the salt + derived hash pair behind the password gate,
//! and its persisted (base64) representation.
//!
//! Decoding never fails hard. Anything that does not form a complete,
//! well-sized record becomes [`CredentialState::Corrupt`], which keeps the raw
//! fields so they can be written back untouched.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::warn;
use zeroize::ZeroizeOnDrop;

use crate::crypto::{
    constant_time_eq, derive_key, generate_salt, CryptoError, KdfParams, DERIVED_KEY_LEN,
    SALT_LEN,
};

#[derive(Clone, ZeroizeOnDrop)]
pub struct CredentialRecord {
    salt: [u8; SALT_LEN],
    derived_hash: [u8; DERIVED_KEY_LEN],
    #[zeroize(skip)]
    kdf: KdfParams,
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("salt", &"[REDACTED]")
            .field("derived_hash", &"[REDACTED]")
            .field("kdf", &self.kdf)
            .finish()
    }
}

impl CredentialRecord {
    /// Derives a record for `password` under a freshly generated salt.
    pub fn derive(password: &str, kdf: KdfParams) -> Result<Self, CryptoError> {
        let salt = generate_salt()?;
        let key = derive_key(password, &salt, &kdf)?;
        let mut derived_hash = [0u8; DERIVED_KEY_LEN];
        derived_hash.copy_from_slice(&key);
        Ok(Self {
            salt,
            derived_hash,
            kdf,
        })
    }

    pub fn matches(&self, candidate: &str) -> Result<bool, CryptoError> {
        let key = derive_key(candidate, &self.salt, &self.kdf)?;
        Ok(constant_time_eq(&key, &self.derived_hash))
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn derived_hash(&self) -> &[u8] {
        &self.derived_hash
    }

    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }
}

/// Raw persisted credential fields as they appear in the settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredCredential {
    #[serde(rename = "passwordSalt", default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    #[serde(rename = "passwordHash", default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(rename = "passwordKdf", default, skip_serializing_if = "Option::is_none")]
    pub kdf: Option<serde_json::Value>,
}

impl StoredCredential {
    pub fn is_empty(&self) -> bool {
        self.salt.is_none() && self.hash.is_none() && self.kdf.is_none()
    }
}

/// A persisted record that failed to decode. Verification against it always fails.
#[derive(Debug, Clone, PartialEq)]
pub struct CorruptCredential {
    pub stored: StoredCredential,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub enum CredentialState {
    Disabled,
    Enabled(CredentialRecord),
    Corrupt(CorruptCredential),
}

impl CredentialState {
    pub fn decode(stored: StoredCredential) -> Self {
        if stored.is_empty() {
            return CredentialState::Disabled;
        }
        match decode_record(&stored) {
            Ok(record) => CredentialState::Enabled(record),
            Err(reason) => {
                warn!(%reason, "stored credential record is malformed; password gate fails closed");
                CredentialState::Corrupt(CorruptCredential { stored, reason })
            }
        }
    }

    pub fn encode(&self) -> StoredCredential {
        match self {
            CredentialState::Disabled => StoredCredential::default(),
            CredentialState::Enabled(record) => StoredCredential {
                salt: Some(general_purpose::STANDARD.encode(record.salt)),
                hash: Some(general_purpose::STANDARD.encode(record.derived_hash)),
                kdf: serde_json::to_value(record.kdf).ok(),
            },
            CredentialState::Corrupt(corrupt) => corrupt.stored.clone(),
        }
    }
}

fn decode_record(stored: &StoredCredential) -> Result<CredentialRecord, String> {
    let salt_b64 = stored.salt.as_deref().ok_or("salt missing")?;
    let hash_b64 = stored.hash.as_deref().ok_or("hash missing")?;
    let salt = decode_fixed::<SALT_LEN>(salt_b64, "salt")?;
    let derived_hash = decode_fixed::<DERIVED_KEY_LEN>(hash_b64, "hash")?;
    let kdf = match &stored.kdf {
        Some(value) => serde_json::from_value::<KdfParams>(value.clone())
            .map_err(|e| format!("kdf parameters unreadable: {e}"))?,
        None => KdfParams::default(),
    };
    kdf.validate().map_err(|e| e.to_string())?;
    Ok(CredentialRecord {
        salt,
        derived_hash,
        kdf,
    })
}

fn decode_fixed<const N: usize>(encoded: &str, field: &str) -> Result<[u8; N], String> {
    let bytes = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| format!("{field} is not base64: {e}"))?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| format!("{field} length invalid: expected {N}, got {len}"))
}
