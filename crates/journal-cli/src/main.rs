mod prompt;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use journal_core::credential::CredentialState;
use journal_core::crypto::KdfParams;
use journal_core::{
    AppContext, ChangePasswordForm, Dialog, FolderChoice, FolderStep, JournalError, PasswordStep,
    RetryReason, SettingsStore,
};
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::prompt::Prompter;

/// Lets the hidden `--kdf-*` flags go below the minimum cost. Test runs only.
const INSECURE_KDF_ENV: &str = "JOURNAL_INSECURE_KDF";

#[derive(Parser, Debug)]
#[command(name = "journal-settings")]
#[command(author, version, about = "Journaley password and journal folder settings", long_about = None)]
struct Cli {
    /// Settings file (defaults to JOURNAL_SETTINGS_PATH, then the platform config dir)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Argon2 memory cost in KiB for newly created password records (at least 19456)
    #[arg(long, global = true, hide = true)]
    kdf_memory_kib: Option<u32>,

    /// Argon2 iteration count for newly created password records (at least 2)
    #[arg(long, global = true, hide = true)]
    kdf_iterations: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the current settings
    Status,

    /// Check the journal password
    Unlock,

    /// Turn on password protection
    EnablePassword,

    /// Change the journal password
    ChangePassword,

    /// Turn off password protection
    RemovePassword,

    /// Forget a password record that can no longer be read
    ResetPassword {
        /// Skip the confirmation question
        #[arg(long)]
        yes: bool,
    },

    /// Choose the folder that holds the journal
    SetFolder {
        /// Folder to use; created entries go under <PATH>/entries
        path: PathBuf,
        /// Answer yes to folder setup questions
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let store = match &cli.settings {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::open_default()?,
    };
    let store = store.with_kdf(kdf_params(&cli)?);
    debug!(path = %store.path().display(), "using settings file");
    let mut ctx = AppContext::load(store).context("cannot load settings")?;
    let mut prompter = Prompter::default();

    match cli.command {
        Commands::Status => {
            println!("{}", serde_json::to_string_pretty(&status(&ctx))?);
        }
        Commands::Unlock => {
            password_loop(&mut ctx, AppContext::unlock, || {
                prompter.current_password("Password")
            })?;
            println!("Unlocked");
        }
        Commands::EnablePassword => {
            if ctx.settings().has_password() {
                bail!("password protection is already enabled");
            }
            password_loop(&mut ctx, AppContext::enable_password, || {
                prompter.new_password()
            })?;
            println!("Password protection enabled");
        }
        Commands::ChangePassword => {
            require_password(&ctx)?;
            password_loop(&mut ctx, AppContext::change_password, || {
                let current = match prompter.current_password("Current password")? {
                    Dialog::Submitted(form) => form,
                    Dialog::Cancelled => return Ok(Dialog::Cancelled),
                };
                Ok(match prompter.new_password()? {
                    Dialog::Submitted(new) => {
                        Dialog::Submitted(ChangePasswordForm::new(current.current.as_str(), new))
                    }
                    Dialog::Cancelled => Dialog::Cancelled,
                })
            })?;
            println!("Password changed");
        }
        Commands::RemovePassword => {
            require_password(&ctx)?;
            password_loop(&mut ctx, AppContext::remove_password, || {
                prompter.current_password("Current password")
            })?;
            println!("Password protection removed");
        }
        Commands::ResetPassword { yes } => {
            if !ctx.settings().vault().is_corrupt() {
                bail!("the stored password record is readable; use change-password or remove-password");
            }
            let question = "The stored password cannot be read. Forget it and disable protection?";
            if !prompter.confirm(question, yes)? {
                bail!("cancelled");
            }
            ctx.reset_corrupt_password()?;
            println!("Password protection disabled");
        }
        Commands::SetFolder { path, yes } => {
            let root = select_folder(&mut ctx, &mut prompter, path, yes)?;
            println!("Journal folder: {}", root.display());
        }
    }
    Ok(())
}

/// Shows a password dialog until the step is accepted or the dialog cancelled.
fn password_loop<T>(
    ctx: &mut AppContext,
    step: fn(&mut AppContext, Dialog<T>) -> Result<PasswordStep, JournalError>,
    mut ask: impl FnMut() -> Result<Dialog<T>>,
) -> Result<()> {
    loop {
        match step(ctx, ask()?)? {
            PasswordStep::Accept => return Ok(()),
            PasswordStep::Cancel => bail!("cancelled"),
            PasswordStep::Retry(RetryReason::CorruptCredential) => {
                bail!(
                    "{} Run `journal-settings reset-password`.",
                    RetryReason::CorruptCredential
                )
            }
            PasswordStep::Retry(reason) => eprintln!("{reason}"),
        }
    }
}

fn select_folder(
    ctx: &mut AppContext,
    prompter: &mut Prompter,
    path: PathBuf,
    assume_yes: bool,
) -> Result<PathBuf> {
    let path = if path.is_relative() {
        std::env::current_dir()?.join(path)
    } else {
        path
    };
    let mut choice = FolderChoice::new(path);
    loop {
        match ctx.select_store_root(Dialog::Submitted(choice.clone()))? {
            FolderStep::Accept(root) => return Ok(root),
            FolderStep::Confirm(kind) => {
                let yes = prompter.confirm(kind.prompt(), assume_yes)?;
                choice = choice.confirmed(yes);
            }
            FolderStep::Retry(reason) => return Err(anyhow!("{reason}")),
            FolderStep::Cancel => bail!("cancelled"),
        }
    }
}

fn require_password(ctx: &AppContext) -> Result<()> {
    if !ctx.settings().has_password() {
        bail!("password protection is not enabled");
    }
    Ok(())
}

fn kdf_params(cli: &Cli) -> Result<KdfParams> {
    let defaults = KdfParams::default();
    if cli.kdf_memory_kib.is_none() && cli.kdf_iterations.is_none() {
        return Ok(defaults);
    }
    let memory_kib = cli.kdf_memory_kib.unwrap_or(defaults.memory_kib);
    let iterations = cli.kdf_iterations.unwrap_or(defaults.iterations);
    let params = if std::env::var_os(INSECURE_KDF_ENV).is_some() {
        warn!(memory_kib, iterations, "minimum kdf cost disabled");
        KdfParams::insecure(memory_kib, iterations, defaults.parallelism)
    } else {
        KdfParams::new(memory_kib, iterations, defaults.parallelism)
    };
    params.map_err(|e| anyhow!("kdf parameters: {e}"))
}

fn status(ctx: &AppContext) -> serde_json::Value {
    let settings = ctx.settings();
    let password = match settings.vault().state() {
        CredentialState::Disabled => "disabled",
        CredentialState::Enabled(_) => "enabled",
        CredentialState::Corrupt(_) => "corrupt",
    };
    serde_json::json!({
        "settingsPath": ctx.store().path().display().to_string(),
        "firstRun": settings.is_first_run(),
        "storeRoot": settings.store_root().map(|p| p.display().to_string()),
        "complete": ctx.is_complete(),
        "password": password,
    })
}
