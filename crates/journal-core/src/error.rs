use std::path::PathBuf;
use thiserror::Error;

use crate::vault::VaultError;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("cannot determine configuration directory")]
    NoConfigDir,

    #[error("settings I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings file {path} is unreadable: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialisation error: {0}")]
    Serialise(#[from] serde_json::Error),

    #[error("cannot replace settings file {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },

    #[error(transparent)]
    Vault(#[from] VaultError),
}
