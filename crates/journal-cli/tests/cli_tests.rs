use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn cli(settings: &Path) -> Command {
    let mut cmd = Command::cargo_bin("journal-settings").unwrap();
    cmd.env_remove("JOURNAL_PASSWORD")
        .env_remove("JOURNAL_NEW_PASSWORD")
        .env_remove("JOURNAL_NEW_PASSWORD_CONFIRM")
        .env_remove("JOURNAL_SETTINGS_PATH")
        .env("JOURNAL_INSECURE_KDF", "1")
        .arg("--settings")
        .arg(settings)
        .args(["--kdf-memory-kib", "256", "--kdf-iterations", "1"]);
    cmd
}

fn status(settings: &Path) -> serde_json::Value {
    let output = cli(settings).arg("status").output().unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn status_on_first_run() {
    let dir = tempdir().unwrap();
    let value = status(&dir.path().join("settings.json"));
    assert_eq!(value["firstRun"], true);
    assert_eq!(value["password"], "disabled");
    assert_eq!(value["complete"], false);
    assert!(value["storeRoot"].is_null());
}

#[test]
fn set_folder_initializes_empty_directory() {
    let dir = tempdir().unwrap();
    let settings = dir.path().join("settings.json");
    let journal = dir.path().join("journal");
    fs::create_dir(&journal).unwrap();

    cli(&settings)
        .arg("set-folder")
        .arg(&journal)
        .arg("--yes")
        .assert()
        .success()
        .stdout(predicate::str::contains("Journal folder:"));
    assert!(journal.join("entries").is_dir());

    let value = status(&settings);
    assert_eq!(value["complete"], true);
    assert_eq!(value["firstRun"], false);
}

#[test]
fn set_folder_declined_leaves_directory_alone() {
    let dir = tempdir().unwrap();
    let settings = dir.path().join("settings.json");
    let docs = dir.path().join("docs");
    fs::create_dir(&docs).unwrap();
    fs::write(docs.join("letter.txt"), b"dear").unwrap();

    cli(&settings)
        .arg("set-folder")
        .arg(&docs)
        .write_stdin("n\n")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Journaley"));
    assert!(!docs.join("Journaley").exists());
    assert!(!settings.exists());
}

#[test]
fn set_folder_migrates_non_empty_directory() {
    let dir = tempdir().unwrap();
    let settings = dir.path().join("settings.json");
    let docs = dir.path().join("docs");
    fs::create_dir(&docs).unwrap();
    fs::write(docs.join("letter.txt"), b"dear").unwrap();

    cli(&settings)
        .arg("set-folder")
        .arg(&docs)
        .write_stdin("y\n")
        .assert()
        .success();
    assert!(docs.join("Journaley/entries").is_dir());
    assert_eq!(fs::read(docs.join("letter.txt")).unwrap(), b"dear");
    let root = status(&settings)["storeRoot"].as_str().unwrap().to_string();
    assert!(root.ends_with("Journaley"));
}

#[test]
fn set_folder_rejects_missing_directory() {
    let dir = tempdir().unwrap();
    let settings = dir.path().join("settings.json");
    cli(&settings)
        .arg("set-folder")
        .arg(dir.path().join("missing"))
        .arg("--yes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    assert!(!dir.path().join("missing").exists());
}

#[test]
fn password_enable_unlock_change_remove() {
    let dir = tempdir().unwrap();
    let settings = dir.path().join("settings.json");

    cli(&settings)
        .arg("enable-password")
        .env("JOURNAL_NEW_PASSWORD", "hunter2")
        .assert()
        .success();
    assert_eq!(status(&settings)["password"], "enabled");

    cli(&settings)
        .arg("unlock")
        .env("JOURNAL_PASSWORD", "HUNTER2")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Wrong password!"));
    cli(&settings)
        .arg("unlock")
        .env("JOURNAL_PASSWORD", "hunter2")
        .assert()
        .success()
        .stdout(predicate::str::contains("Unlocked"));

    cli(&settings)
        .arg("change-password")
        .env("JOURNAL_PASSWORD", "wrong")
        .env("JOURNAL_NEW_PASSWORD", "new")
        .assert()
        .failure();
    cli(&settings)
        .arg("change-password")
        .env("JOURNAL_PASSWORD", "hunter2")
        .env("JOURNAL_NEW_PASSWORD", "new")
        .assert()
        .success();
    cli(&settings)
        .arg("unlock")
        .env("JOURNAL_PASSWORD", "new")
        .assert()
        .success();

    cli(&settings)
        .arg("remove-password")
        .env("JOURNAL_PASSWORD", "new")
        .assert()
        .success();
    assert_eq!(status(&settings)["password"], "disabled");
}

#[test]
fn enable_password_rejects_mismatched_confirmation() {
    let dir = tempdir().unwrap();
    let settings = dir.path().join("settings.json");
    cli(&settings)
        .arg("enable-password")
        .env("JOURNAL_NEW_PASSWORD", "one")
        .env("JOURNAL_NEW_PASSWORD_CONFIRM", "two")
        .assert()
        .failure()
        .stderr(predicate::str::contains("do not match"));
    assert_eq!(status(&settings)["password"], "disabled");
}

#[test]
fn corrupt_record_needs_reset() {
    let dir = tempdir().unwrap();
    let settings = dir.path().join("settings.json");
    fs::write(&settings, br#"{"passwordSalt": "AAAA"}"#).unwrap();
    assert_eq!(status(&settings)["password"], "corrupt");

    cli(&settings)
        .arg("unlock")
        .env("JOURNAL_PASSWORD", "anything")
        .assert()
        .failure()
        .stderr(predicate::str::contains("journal-settings reset-password"))
        .stderr(predicate::str::contains("Wrong password!").not());
    cli(&settings)
        .arg("reset-password")
        .arg("--yes")
        .assert()
        .success();
    assert_eq!(status(&settings)["password"], "disabled");
    cli(&settings)
        .arg("reset-password")
        .arg("--yes")
        .assert()
        .failure();
}

#[test]
fn unparseable_settings_file_is_fatal() {
    let dir = tempdir().unwrap();
    let settings = dir.path().join("settings.json");
    fs::write(&settings, b"not json").unwrap();
    cli(&settings)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot load settings"));
}

#[test]
fn cheap_kdf_flags_need_the_test_switch() {
    let dir = tempdir().unwrap();
    let settings = dir.path().join("settings.json");
    cli(&settings)
        .env_remove("JOURNAL_INSECURE_KDF")
        .arg("enable-password")
        .env("JOURNAL_NEW_PASSWORD", "hunter2")
        .assert()
        .failure()
        .stderr(predicate::str::contains("below minimum"));
    assert!(!settings.exists());
}
