//! Persisted settings: the chosen store root plus the credential fields.
//!
//! The file is JSON with camelCase keys (`storeRootPath`, `passwordSalt`,
//! `passwordHash`, `passwordKdf`). Writes go through a temporary file in the
//! same directory and are renamed over the target.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::credential::{CredentialState, StoredCredential};
use crate::crypto::KdfParams;
use crate::error::JournalError;
use crate::paths::settings_path;
use crate::store_root::{StoreFs, StoreRootValidator};
use crate::vault::CredentialVault;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    store_root_path: Option<PathBuf>,
    #[serde(flatten)]
    credential: StoredCredential,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsRecord {
    store_root: Option<PathBuf>,
    vault: CredentialVault,
    first_run: bool,
}

impl SettingsRecord {
    pub fn new(store_root: Option<PathBuf>, vault: CredentialVault) -> Self {
        Self {
            store_root,
            vault,
            first_run: false,
        }
    }

    pub fn store_root(&self) -> Option<&Path> {
        self.store_root.as_deref()
    }

    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    pub fn has_password(&self) -> bool {
        self.vault.is_enabled()
    }

    /// No settings file existed when this record was loaded, and nothing has
    /// been saved since. Setup must not be cancellable in this state.
    pub fn is_first_run(&self) -> bool {
        self.first_run
    }

    /// A store root is recorded and `validator` still accepts it as one.
    pub fn is_complete<F: StoreFs>(&self, validator: &StoreRootValidator<F>) -> bool {
        self.store_root
            .as_deref()
            .is_some_and(|root| validator.is_store_root(root))
    }

    pub(crate) fn vault_mut(&mut self) -> &mut CredentialVault {
        &mut self.vault
    }

    pub(crate) fn set_store_root(&mut self, root: PathBuf) {
        self.store_root = Some(root);
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.first_run = false;
    }

    fn to_persisted(&self) -> PersistedSettings {
        PersistedSettings {
            store_root_path: self.store_root.clone(),
            credential: self.vault.state().encode(),
        }
    }

    fn from_persisted(persisted: PersistedSettings, kdf: KdfParams) -> Self {
        let store_root = persisted
            .store_root_path
            .filter(|p| !p.as_os_str().is_empty());
        let vault =
            CredentialVault::new(CredentialState::decode(persisted.credential)).with_kdf(kdf);
        Self::new(store_root, vault)
    }
}

/// Reads and writes the settings file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    kdf: KdfParams,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kdf: KdfParams::default(),
        }
    }

    /// Store at the platform config location, or `JOURNAL_SETTINGS_PATH` when set.
    pub fn open_default() -> Result<Self, JournalError> {
        Ok(Self::new(settings_path()?))
    }

    /// KDF parameters handed to every vault this store loads.
    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the record, or an empty first-run record when no file exists.
    ///
    /// A file that is not valid JSON is an error, never a default record.
    pub fn load(&self) -> Result<SettingsRecord, JournalError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no settings file; starting first run");
                let vault = CredentialVault::default().with_kdf(self.kdf);
                let mut record = SettingsRecord::new(None, vault);
                record.first_run = true;
                return Ok(record);
            }
            Err(source) => {
                return Err(JournalError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let persisted: PersistedSettings =
            serde_json::from_slice(&data).map_err(|source| JournalError::Parse {
                path: self.path.clone(),
                source,
            })?;
        Ok(SettingsRecord::from_persisted(persisted, self.kdf))
    }

    pub fn save(&self, record: &SettingsRecord) -> Result<(), JournalError> {
        let json = serde_json::to_vec_pretty(&record.to_persisted())?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|source| JournalError::Io {
            path: dir.clone(),
            source,
        })?;
        let io_err = |source: std::io::Error| JournalError::Io {
            path: self.path.clone(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(&json).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path)
            .map_err(|source| JournalError::Persist {
                path: self.path.clone(),
                source,
            })?;
        info!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}
