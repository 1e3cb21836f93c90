//! End-to-end settings flows through `AppContext`, reloading from disk
//! between steps the way the application does across restarts.

use std::fs;
use std::path::{Path, PathBuf};

use journal_core::crypto::KdfParams;
use journal_core::store_root::{ENTRIES_DIR, MIGRATION_DIR};
use journal_core::{
    AppContext, ChangePasswordForm, ConfirmationKind, CurrentPasswordForm, Dialog, FolderChoice,
    FolderStep, NewPasswordForm, PasswordStep, RetryReason, SettingsStore, Verification,
};
use tempfile::tempdir;

fn store(settings: &Path) -> SettingsStore {
    SettingsStore::new(settings).with_kdf(KdfParams::insecure(256, 1, 1).unwrap())
}

fn open(settings: &Path) -> AppContext {
    AppContext::load(store(settings)).unwrap()
}

fn new_pw(p: &str) -> Dialog<NewPasswordForm> {
    Dialog::Submitted(NewPasswordForm::new(p, p))
}

fn current(p: &str) -> Dialog<CurrentPasswordForm> {
    Dialog::Submitted(CurrentPasswordForm::new(p))
}

fn change(old: &str, new: &str) -> Dialog<ChangePasswordForm> {
    Dialog::Submitted(ChangePasswordForm::new(old, NewPasswordForm::new(new, new)))
}

/// Drives the folder dialog the way the settings window does: submit, answer
/// the confirmation question with `answer`, resubmit.
fn pick_folder(ctx: &mut AppContext, path: &Path, answer: bool) -> FolderStep {
    match ctx
        .select_store_root(Dialog::Submitted(FolderChoice::new(path)))
        .unwrap()
    {
        FolderStep::Confirm(_) => ctx
            .select_store_root(Dialog::Submitted(FolderChoice::new(path).confirmed(answer)))
            .unwrap(),
        other => other,
    }
}

#[test]
fn first_run_setup_persists_across_restart() {
    let dir = tempdir().unwrap();
    let settings = dir.path().join("config/settings.json");
    let journal = dir.path().join("journal");
    fs::create_dir(&journal).unwrap();

    let mut ctx = open(&settings);
    assert!(ctx.settings().is_first_run());
    assert_eq!(
        ctx.select_store_root(Dialog::Submitted(FolderChoice::new(&journal)))
            .unwrap(),
        FolderStep::Confirm(ConfirmationKind::InitializeEmpty)
    );
    assert_eq!(
        pick_folder(&mut ctx, &journal, true),
        FolderStep::Accept(journal.clone())
    );
    assert!(!ctx.settings().is_first_run());
    assert!(ctx.is_complete());
    assert_eq!(ctx.enable_password(new_pw("hunter2")).unwrap(), PasswordStep::Accept);

    let mut restarted = open(&settings);
    assert!(!restarted.settings().is_first_run());
    assert_eq!(restarted.settings().store_root(), Some(journal.as_path()));
    assert!(restarted.settings().has_password());
    assert_eq!(
        restarted.unlock(current("HUNTER2")).unwrap(),
        PasswordStep::Retry(RetryReason::WrongPassword)
    );
    assert_eq!(restarted.unlock(current("hunter2")).unwrap(), PasswordStep::Accept);
}

#[test]
fn password_lifecycle_scenario() {
    let dir = tempdir().unwrap();
    let settings = dir.path().join("settings.json");
    let mut ctx = open(&settings);

    ctx.enable_password(new_pw("hunter2")).unwrap();
    let before = fs::read(&settings).unwrap();

    assert_eq!(
        ctx.change_password(change("wrong", "new")).unwrap(),
        PasswordStep::Retry(RetryReason::WrongPassword)
    );
    assert_eq!(fs::read(&settings).unwrap(), before);
    assert_eq!(
        ctx.settings().vault().verify_password("hunter2").unwrap(),
        Verification::Granted
    );

    assert_eq!(
        ctx.change_password(change("hunter2", "new")).unwrap(),
        PasswordStep::Accept
    );
    let reloaded = open(&settings);
    let vault = reloaded.settings().vault();
    assert_eq!(vault.verify_password("new").unwrap(), Verification::Granted);
    assert_eq!(vault.verify_password("hunter2").unwrap(), Verification::Denied);

    assert_eq!(
        ctx.remove_password(current("hunter2")).unwrap(),
        PasswordStep::Retry(RetryReason::WrongPassword)
    );
    assert_eq!(ctx.remove_password(current("new")).unwrap(), PasswordStep::Accept);
    let reloaded = open(&settings);
    assert_eq!(
        reloaded.settings().vault().verify_password("new").unwrap(),
        Verification::NotRequired
    );
}

#[test]
fn re_enabling_the_same_password_stores_a_new_record() {
    let dir = tempdir().unwrap();
    let settings = dir.path().join("settings.json");
    let mut ctx = open(&settings);

    ctx.enable_password(new_pw("same")).unwrap();
    let first: serde_json::Value = serde_json::from_slice(&fs::read(&settings).unwrap()).unwrap();
    ctx.remove_password(current("same")).unwrap();
    ctx.enable_password(new_pw("same")).unwrap();
    let second: serde_json::Value = serde_json::from_slice(&fs::read(&settings).unwrap()).unwrap();

    assert_ne!(first["passwordSalt"], second["passwordSalt"]);
    assert_ne!(first["passwordHash"], second["passwordHash"]);
    assert_eq!(ctx.unlock(current("same")).unwrap(), PasswordStep::Accept);
}

#[test]
fn migration_of_non_empty_folder_keeps_user_files() {
    let dir = tempdir().unwrap();
    let settings = dir.path().join("settings.json");
    let docs = dir.path().join("Documents");
    fs::create_dir(&docs).unwrap();
    fs::write(docs.join("resume.docx"), b"resume bytes").unwrap();

    let mut ctx = open(&settings);
    let nested: PathBuf = docs.join(MIGRATION_DIR);
    assert_eq!(
        pick_folder(&mut ctx, &docs, true),
        FolderStep::Accept(nested.clone())
    );
    assert!(nested.join(ENTRIES_DIR).is_dir());
    assert_eq!(fs::read(docs.join("resume.docx")).unwrap(), b"resume bytes");
    assert_eq!(open(&settings).settings().store_root(), Some(nested.as_path()));

    // Choosing the accepted root again is a no-op.
    assert_eq!(
        ctx.select_store_root(Dialog::Submitted(FolderChoice::new(&nested)))
            .unwrap(),
        FolderStep::Accept(nested.clone())
    );
}

#[test]
fn declined_or_missing_folders_are_retried_without_mutation() {
    let dir = tempdir().unwrap();
    let settings = dir.path().join("settings.json");
    let docs = dir.path().join("Documents");
    fs::create_dir(&docs).unwrap();
    fs::write(docs.join("a.txt"), b"a").unwrap();

    let mut ctx = open(&settings);
    assert!(matches!(
        pick_folder(&mut ctx, &docs, false),
        FolderStep::Retry(RetryReason::Folder(_))
    ));
    assert!(!docs.join(MIGRATION_DIR).exists());
    assert!(matches!(
        pick_folder(&mut ctx, &dir.path().join("missing"), true),
        FolderStep::Retry(RetryReason::Folder(_))
    ));
    assert!(!dir.path().join("missing").exists());
    assert!(!settings.exists());
    assert!(ctx.settings().store_root().is_none());
}

#[test]
fn corrupt_record_fails_closed_until_reset() {
    let dir = tempdir().unwrap();
    let settings = dir.path().join("settings.json");
    fs::write(
        &settings,
        br#"{"passwordSalt": "c2FsdA==", "passwordHash": "aGFzaA=="}"#,
    )
    .unwrap();

    let mut ctx = open(&settings);
    assert!(ctx.settings().has_password());
    for candidate in ["", "salt", "hash", "hunter2"] {
        assert_eq!(
            ctx.unlock(current(candidate)).unwrap(),
            PasswordStep::Retry(RetryReason::CorruptCredential)
        );
    }
    assert_eq!(ctx.failed_attempts(), 0);
    assert!(ctx.enable_password(new_pw("fresh")).is_err());

    ctx.reset_corrupt_password().unwrap();
    assert_eq!(ctx.unlock(current("anything")).unwrap(), PasswordStep::Accept);
    assert_eq!(ctx.enable_password(new_pw("fresh")).unwrap(), PasswordStep::Accept);
    assert_eq!(
        open(&settings).unlock(current("fresh")).unwrap(),
        PasswordStep::Accept
    );
}

#[test]
fn tampered_kdf_cost_is_refused_without_hashing() {
    let dir = tempdir().unwrap();
    let settings = dir.path().join("settings.json");
    let mut ctx = open(&settings);
    ctx.enable_password(new_pw("hunter2")).unwrap();

    let mut value: serde_json::Value = serde_json::from_slice(&fs::read(&settings).unwrap()).unwrap();
    value["passwordKdf"] =
        serde_json::json!({"memoryKib": 4_000_000_000u32, "iterations": 1, "parallelism": 1});
    fs::write(&settings, serde_json::to_vec(&value).unwrap()).unwrap();

    let mut tampered = open(&settings);
    assert!(tampered.settings().vault().is_corrupt());
    assert_eq!(
        tampered.unlock(current("hunter2")).unwrap(),
        PasswordStep::Retry(RetryReason::CorruptCredential)
    );
}
