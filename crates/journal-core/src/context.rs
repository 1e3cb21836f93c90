//! The application context: the single owner of [`SettingsRecord`].
//!
//! Each step applies the requested change to a copy of the record, persists
//! the copy, and only then swaps it in. A rejected step or a failed save
//! leaves both memory and disk as they were.

use tracing::{info, warn};

use crate::error::JournalError;
use crate::session::{
    ChangePasswordForm, CurrentPasswordForm, Dialog, FolderChoice, FolderStep, NewPasswordForm,
    PasswordStep, RetryReason,
};
use crate::settings::{SettingsRecord, SettingsStore};
use crate::store_root::{Decision, OsFs, StoreFs, StoreRootValidator};
use crate::vault::{Attempt, VaultError, Verification};

pub struct AppContext<F: StoreFs = OsFs> {
    settings: SettingsRecord,
    store: SettingsStore,
    validator: StoreRootValidator<F>,
    failed_attempts: u32,
}

impl AppContext<OsFs> {
    /// Loads settings from `store`; call once at startup.
    pub fn load(store: SettingsStore) -> Result<Self, JournalError> {
        Self::load_with_fs(store, OsFs)
    }
}

impl<F: StoreFs> AppContext<F> {
    pub fn load_with_fs(store: SettingsStore, fs: F) -> Result<Self, JournalError> {
        let settings = store.load()?;
        Ok(Self {
            settings,
            store,
            validator: StoreRootValidator::new(fs),
            failed_attempts: 0,
        })
    }

    pub fn settings(&self) -> &SettingsRecord {
        &self.settings
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    /// The recorded store root still holds its `entries` directory.
    pub fn is_complete(&self) -> bool {
        self.settings.is_complete(&self.validator)
    }

    /// Wrong passwords entered since the last accepted password step.
    /// Nothing throttles guessing; this only feeds the log.
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Startup gate. Accepts immediately when protection is disabled.
    pub fn unlock(
        &mut self,
        dialog: Dialog<CurrentPasswordForm>,
    ) -> Result<PasswordStep, JournalError> {
        let form = match dialog {
            Dialog::Submitted(form) => form,
            Dialog::Cancelled => return Ok(PasswordStep::Cancel),
        };
        if self.settings.vault().is_corrupt() {
            return Ok(self.corrupt_credential());
        }
        match self.settings.vault().verify_password(&form.current)? {
            Verification::NotRequired | Verification::Granted => Ok(self.accepted()),
            Verification::Denied => Ok(self.wrong_password()),
        }
    }

    pub fn enable_password(
        &mut self,
        dialog: Dialog<NewPasswordForm>,
    ) -> Result<PasswordStep, JournalError> {
        let form = match dialog {
            Dialog::Submitted(form) => form,
            Dialog::Cancelled => return Ok(PasswordStep::Cancel),
        };
        if let Some(retry) = check_new_password(&form) {
            return Ok(PasswordStep::Retry(retry));
        }
        let mut next = self.settings.clone();
        next.vault_mut().enable_password(&form.password)?;
        self.commit(next)?;
        Ok(self.accepted())
    }

    pub fn change_password(
        &mut self,
        dialog: Dialog<ChangePasswordForm>,
    ) -> Result<PasswordStep, JournalError> {
        let form = match dialog {
            Dialog::Submitted(form) => form,
            Dialog::Cancelled => return Ok(PasswordStep::Cancel),
        };
        if self.settings.vault().is_corrupt() {
            return Ok(self.corrupt_credential());
        }
        if let Some(retry) = check_new_password(&form.new) {
            return Ok(PasswordStep::Retry(retry));
        }
        let mut next = self.settings.clone();
        match next
            .vault_mut()
            .change_password(&form.current, &form.new.password)
        {
            Ok(Attempt::Accepted) => {}
            Ok(Attempt::Rejected) => return Ok(self.wrong_password()),
            Err(VaultError::EmptyPassword) => {
                return Ok(PasswordStep::Retry(RetryReason::EmptyPassword))
            }
            Err(e) => return Err(e.into()),
        }
        self.commit(next)?;
        Ok(self.accepted())
    }

    pub fn remove_password(
        &mut self,
        dialog: Dialog<CurrentPasswordForm>,
    ) -> Result<PasswordStep, JournalError> {
        let form = match dialog {
            Dialog::Submitted(form) => form,
            Dialog::Cancelled => return Ok(PasswordStep::Cancel),
        };
        if self.settings.vault().is_corrupt() {
            return Ok(self.corrupt_credential());
        }
        let mut next = self.settings.clone();
        if next.vault_mut().remove_password(&form.current)? == Attempt::Rejected {
            return Ok(self.wrong_password());
        }
        self.commit(next)?;
        Ok(self.accepted())
    }

    /// Drops a corrupt credential record so a new password can be set.
    pub fn reset_corrupt_password(&mut self) -> Result<(), JournalError> {
        let mut next = self.settings.clone();
        next.vault_mut().reset_corrupt()?;
        self.commit(next)?;
        self.failed_attempts = 0;
        Ok(())
    }

    pub fn select_store_root(
        &mut self,
        dialog: Dialog<FolderChoice>,
    ) -> Result<FolderStep, JournalError> {
        let choice = match dialog {
            Dialog::Submitted(choice) => choice,
            Dialog::Cancelled => return Ok(FolderStep::Cancel),
        };
        let decision = self.validator.validate(&choice.path, choice.confirmation);
        let root = match decision {
            Decision::NeedsConfirmation(kind) => return Ok(FolderStep::Confirm(kind)),
            Decision::Rejected(reason) => {
                return Ok(FolderStep::Retry(RetryReason::Folder(reason)))
            }
            Decision::AcceptedAsIs(root)
            | Decision::AcceptedAfterInit(root)
            | Decision::AcceptedAfterMigration(root) => root,
        };
        let mut next = self.settings.clone();
        next.set_store_root(root.clone());
        self.commit(next)?;
        info!(path = %root.display(), "store root selected");
        Ok(FolderStep::Accept(root))
    }

    fn commit(&mut self, mut next: SettingsRecord) -> Result<(), JournalError> {
        self.store.save(&next)?;
        next.mark_persisted();
        self.settings = next;
        Ok(())
    }

    fn accepted(&mut self) -> PasswordStep {
        self.failed_attempts = 0;
        PasswordStep::Accept
    }

    // Leaves `failed_attempts` unchanged.
    fn corrupt_credential(&self) -> PasswordStep {
        warn!("password step refused: stored credential record is corrupt");
        PasswordStep::Retry(RetryReason::CorruptCredential)
    }

    fn wrong_password(&mut self) -> PasswordStep {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        warn!(failed_attempts = self.failed_attempts, "wrong password entered");
        PasswordStep::Retry(RetryReason::WrongPassword)
    }
}

fn check_new_password(form: &NewPasswordForm) -> Option<RetryReason> {
    if form.password.is_empty() {
        Some(RetryReason::EmptyPassword)
    } else if form.password.as_str() != form.confirm.as_str() {
        Some(RetryReason::PasswordsDiffer)
    } else {
        None
    }
}
