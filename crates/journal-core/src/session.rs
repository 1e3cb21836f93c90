//! Dialog inputs and step outcomes for the settings and unlock prompts.
//!
//! The presentation layer owns the loop: show a dialog, hand the submission
//! to an [`crate::AppContext`] step, then act on the returned step. `Retry`
//! means show the dialog again with the given reason; `Accept` and `Cancel`
//! end the loop.

use std::path::PathBuf;
use zeroize::Zeroizing;

use crate::store_root::{Confirmation, ConfirmationKind, RejectReason};

/// What came back from one showing of a dialog.
#[derive(Debug, Clone)]
pub enum Dialog<T> {
    Submitted(T),
    Cancelled,
}

/// A new password typed twice.
#[derive(Clone)]
pub struct NewPasswordForm {
    pub password: Zeroizing<String>,
    pub confirm: Zeroizing<String>,
}

impl NewPasswordForm {
    pub fn new(password: impl Into<String>, confirm: impl Into<String>) -> Self {
        Self {
            password: Zeroizing::new(password.into()),
            confirm: Zeroizing::new(confirm.into()),
        }
    }
}

#[derive(Clone)]
pub struct ChangePasswordForm {
    pub current: Zeroizing<String>,
    pub new: NewPasswordForm,
}

impl ChangePasswordForm {
    pub fn new(current: impl Into<String>, new: NewPasswordForm) -> Self {
        Self {
            current: Zeroizing::new(current.into()),
            new,
        }
    }
}

/// The current password, for unlock and removal.
#[derive(Clone)]
pub struct CurrentPasswordForm {
    pub current: Zeroizing<String>,
}

impl CurrentPasswordForm {
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            current: Zeroizing::new(current.into()),
        }
    }
}

/// A folder picked by the user, with their answer to any pending confirmation.
#[derive(Debug, Clone)]
pub struct FolderChoice {
    pub path: PathBuf,
    pub confirmation: Confirmation,
}

impl FolderChoice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            confirmation: Confirmation::Pending,
        }
    }

    pub fn confirmed(mut self, yes: bool) -> Self {
        self.confirmation = if yes {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    WrongPassword,
    PasswordsDiffer,
    EmptyPassword,
    /// The stored record cannot be read; no password will match until it is reset.
    CorruptCredential,
    Folder(RejectReason),
}

impl std::fmt::Display for RetryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongPassword => write!(f, "Wrong password!"),
            Self::PasswordsDiffer => write!(f, "The new passwords do not match."),
            Self::EmptyPassword => write!(f, "The password must not be empty."),
            Self::CorruptCredential => write!(
                f,
                "The stored password cannot be read. Reset it to disable protection, \
                 then set a new password."
            ),
            Self::Folder(reason) => write!(f, "{reason}. Please select another folder."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordStep {
    Accept,
    Retry(RetryReason),
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderStep {
    /// The store root now recorded (may differ from the chosen folder after migration).
    Accept(PathBuf),
    /// Ask the user, then resubmit the same folder with their answer.
    Confirm(ConfirmationKind),
    Retry(RetryReason),
    Cancel,
}

impl ConfirmationKind {
    /// Question to put to the user before the mutation happens.
    pub fn prompt(&self) -> &'static str {
        match self {
            ConfirmationKind::InitializeEmpty => {
                "The selected folder is empty. Would you like to use this folder to store your data?"
            }
            ConfirmationKind::CreateSubfolder => {
                "The selected folder is not a Journaley folder. Would you like to create a \
                 subfolder named \"Journaley\" and use it to store your data?"
            }
        }
    }
}
