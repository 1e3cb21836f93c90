use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

pub const KDF_TIME_COST: u32 = 3;
pub const KDF_MEMORY_COST: u32 = 65536; // 64MB
pub const KDF_PARALLELISM: u32 = 4;
pub const DERIVED_KEY_LEN: usize = 32;
pub const SALT_LEN: usize = 32;

/// Floor for newly created records.
pub const MIN_MEMORY_KIB: u32 = 19 * 1024;
pub const MIN_ITERATIONS: u32 = 2;

/// Ceilings for any record, including ones read back from disk.
pub const MAX_MEMORY_KIB: u32 = 1024 * 1024; // 1GiB
pub const MAX_ITERATIONS: u32 = 64;
pub const MAX_PARALLELISM: u32 = 16;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("entropy source unavailable: {0}")]
    Entropy(String),
    #[error("invalid kdf parameters: {0}")]
    Params(String),
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
}

/// Argon2id cost parameters, persisted next to every credential record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: KDF_MEMORY_COST,
            iterations: KDF_TIME_COST,
            parallelism: KDF_PARALLELISM,
        }
    }
}

impl KdfParams {
    /// Builds a parameter set for new records. Costs below `MIN_MEMORY_KIB` or
    /// `MIN_ITERATIONS`, above the `MAX_*` ceilings, or refused by Argon2 are errors.
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, CryptoError> {
        if memory_kib < MIN_MEMORY_KIB || iterations < MIN_ITERATIONS {
            return Err(CryptoError::Params(format!(
                "cost below minimum (memory {memory_kib} KiB < {MIN_MEMORY_KIB} KiB \
                 or iterations {iterations} < {MIN_ITERATIONS})"
            )));
        }
        Self::insecure(memory_kib, iterations, parallelism)
    }

    /// Like [`KdfParams::new`] without the minimum cost. Test fixtures only.
    #[doc(hidden)]
    pub fn insecure(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, CryptoError> {
        let params = Self {
            memory_kib,
            iterations,
            parallelism,
        };
        params.validate()?;
        Ok(params)
    }

    /// Checks the ceilings and Argon2's own limits. Stored records are held to
    /// this, not to the minimum cost of [`KdfParams::new`].
    pub fn validate(&self) -> Result<(), CryptoError> {
        self.argon2_params().map(|_| ())
    }

    fn argon2_params(&self) -> Result<Params, CryptoError> {
        if self.memory_kib > MAX_MEMORY_KIB
            || self.iterations > MAX_ITERATIONS
            || self.parallelism > MAX_PARALLELISM
        {
            return Err(CryptoError::Params(format!(
                "cost above ceiling (memory {} KiB, iterations {}, parallelism {})",
                self.memory_kib, self.iterations, self.parallelism
            )));
        }
        Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(DERIVED_KEY_LEN),
        )
        .map_err(|e| CryptoError::Params(e.to_string()))
    }
}

pub fn derive_key(
    password: &str,
    salt: &[u8],
    params: &KdfParams,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.argon2_params()?);
    let mut key = Zeroizing::new(vec![0u8; DERIVED_KEY_LEN]);
    argon
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

pub fn generate_salt() -> Result<[u8; SALT_LEN], CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| CryptoError::Entropy(e.to_string()))?;
    Ok(salt)
}

/// Constant-time comparison to prevent timing side channels.
/// Lengths are not secret; a length mismatch returns early.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
