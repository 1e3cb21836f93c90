//! Store-root validation and bootstrap.
//!
//! A store root is a directory containing an `entries` subdirectory. Given a
//! user-chosen path, [`StoreRootValidator::validate`] either accepts it as is,
//! initializes it (empty directory), migrates into a nested `Journaley`
//! folder (non-empty directory), or rejects it. Initialization and migration
//! only happen after the caller passes [`Confirmation::Confirmed`].
//!
//! Only directories are ever created; nothing is removed or rewritten.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const ENTRIES_DIR: &str = "entries";
pub const MIGRATION_DIR: &str = "Journaley";

/// The filesystem surface the validator needs.
pub trait StoreFs {
    fn is_dir(&self, path: &Path) -> bool;
    fn is_empty_dir(&self, path: &Path) -> io::Result<bool>;
    fn create_dir(&self, path: &Path) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl StoreFs for OsFs {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_empty_dir(&self, path: &Path) -> io::Result<bool> {
        Ok(fs::read_dir(path)?.next().is_none())
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }
}

/// What the user has said about the pending mutation, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Pending,
    Confirmed,
    Declined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationKind {
    /// Directory is empty; create `entries` inside it.
    InitializeEmpty,
    /// Directory has foreign content; create `Journaley/entries` inside it.
    CreateSubfolder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    NotAbsolute,
    NotFound,
    Unreadable { message: String },
    Declined,
    CreateFailed { path: PathBuf, message: String },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAbsolute => write!(f, "the folder path must be absolute"),
            Self::NotFound => write!(f, "the provided folder does not exist"),
            Self::Unreadable { message } => write!(f, "the folder cannot be read: {message}"),
            Self::Declined => write!(f, "the folder was not set up"),
            Self::CreateFailed { path, message } => {
                write!(f, "failed to create {}: {message}", path.display())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Rejected(RejectReason),
    AcceptedAsIs(PathBuf),
    AcceptedAfterInit(PathBuf),
    AcceptedAfterMigration(PathBuf),
    NeedsConfirmation(ConfirmationKind),
}

impl Decision {
    /// The store root to record, for any accepted decision.
    pub fn accepted_path(&self) -> Option<&Path> {
        match self {
            Decision::AcceptedAsIs(p)
            | Decision::AcceptedAfterInit(p)
            | Decision::AcceptedAfterMigration(p) => Some(p.as_path()),
            Decision::Rejected(_) | Decision::NeedsConfirmation(_) => None,
        }
    }
}

pub struct StoreRootValidator<F: StoreFs = OsFs> {
    fs: F,
}

impl Default for StoreRootValidator<OsFs> {
    fn default() -> Self {
        Self::new(OsFs)
    }
}

impl<F: StoreFs> StoreRootValidator<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// Checks whether `root` is a valid store root right now, without mutating anything.
    pub fn is_store_root(&self, root: &Path) -> bool {
        self.fs.is_dir(&root.join(ENTRIES_DIR))
    }

    pub fn validate(&self, candidate: &Path, confirmation: Confirmation) -> Decision {
        if !candidate.is_absolute() {
            return Decision::Rejected(RejectReason::NotAbsolute);
        }
        if !self.fs.is_dir(candidate) {
            debug!(path = %candidate.display(), "candidate store root does not exist");
            return Decision::Rejected(RejectReason::NotFound);
        }
        if self.is_store_root(candidate) {
            return Decision::AcceptedAsIs(candidate.to_path_buf());
        }

        let empty = match self.fs.is_empty_dir(candidate) {
            Ok(empty) => empty,
            Err(e) => {
                warn!(path = %candidate.display(), error = %e, "cannot list candidate store root");
                return Decision::Rejected(RejectReason::Unreadable {
                    message: e.to_string(),
                });
            }
        };
        let kind = if empty {
            ConfirmationKind::InitializeEmpty
        } else {
            ConfirmationKind::CreateSubfolder
        };

        match confirmation {
            Confirmation::Pending => Decision::NeedsConfirmation(kind),
            Confirmation::Declined => Decision::Rejected(RejectReason::Declined),
            Confirmation::Confirmed => match kind {
                ConfirmationKind::InitializeEmpty => self.initialize(candidate),
                ConfirmationKind::CreateSubfolder => self.migrate(candidate),
            },
        }
    }

    fn initialize(&self, root: &Path) -> Decision {
        if let Err(rejected) = self.create(&root.join(ENTRIES_DIR)) {
            return rejected;
        }
        info!(path = %root.display(), "initialized empty store root");
        Decision::AcceptedAfterInit(root.to_path_buf())
    }

    // A `Journaley` folder left behind by an earlier partial failure is reused.
    fn migrate(&self, parent: &Path) -> Decision {
        let nested = parent.join(MIGRATION_DIR);
        if !self.fs.is_dir(&nested) {
            if let Err(rejected) = self.create(&nested) {
                return rejected;
            }
        }
        if !self.is_store_root(&nested) {
            if let Err(rejected) = self.create(&nested.join(ENTRIES_DIR)) {
                return rejected;
            }
        }
        info!(path = %nested.display(), "created nested store root");
        Decision::AcceptedAfterMigration(nested)
    }

    fn create(&self, dir: &Path) -> Result<(), Decision> {
        self.fs.create_dir(dir).map_err(|e| {
            warn!(path = %dir.display(), error = %e, "failed to create store directory");
            Decision::Rejected(RejectReason::CreateFailed {
                path: dir.to_path_buf(),
                message: e.to_string(),
            })
        })
    }
}
