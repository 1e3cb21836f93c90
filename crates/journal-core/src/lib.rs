//! Core of the Journaley settings layer: the optional password gate, store-root
//! bootstrap, and the persisted settings record that ties them together.

pub mod context;
pub mod credential;
pub mod crypto;
pub mod error;
pub mod paths;
pub mod session;
pub mod settings;
pub mod store_root;
pub mod vault;

pub use context::AppContext;
pub use error::JournalError;
pub use session::{
    ChangePasswordForm, CurrentPasswordForm, Dialog, FolderChoice, FolderStep, NewPasswordForm,
    PasswordStep, RetryReason,
};
pub use settings::{SettingsRecord, SettingsStore};
pub use store_root::{
    Confirmation, ConfirmationKind, Decision, OsFs, RejectReason, StoreFs, StoreRootValidator,
};
pub use vault::{Attempt, CredentialVault, VaultError, Verification};
