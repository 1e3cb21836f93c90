use directories::ProjectDirs;
use std::path::PathBuf;

use crate::error::JournalError;

pub const APP_QUALIFIER: &str = "com";
pub const APP_ORG: &str = "journaley";
pub const APP_NAME: &str = "journaley";
pub const SETTINGS_FILE: &str = "settings.json";
pub const SETTINGS_PATH_ENV: &str = "JOURNAL_SETTINGS_PATH";

pub fn config_dir() -> Result<PathBuf, JournalError> {
    let dirs =
        ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME).ok_or(JournalError::NoConfigDir)?;
    Ok(dirs.config_dir().to_path_buf())
}

pub fn settings_path() -> Result<PathBuf, JournalError> {
    if let Ok(override_path) = std::env::var(SETTINGS_PATH_ENV) {
        return Ok(PathBuf::from(override_path));
    }
    Ok(config_dir()?.join(SETTINGS_FILE))
}
