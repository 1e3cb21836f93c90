use anyhow::{anyhow, Result};
use journal_core::{CurrentPasswordForm, Dialog, NewPasswordForm};
use std::io::{self, BufRead, Write};
use zeroize::Zeroizing;

pub const PASSWORD_ENV: &str = "JOURNAL_PASSWORD";
pub const NEW_PASSWORD_ENV: &str = "JOURNAL_NEW_PASSWORD";
pub const NEW_PASSWORD_CONFIRM_ENV: &str = "JOURNAL_NEW_PASSWORD_CONFIRM";

/// Terminal stand-ins for the settings dialogs.
///
/// Passwords taken from the environment answer the first prompt only; a
/// second prompt of the same kind reports the dialog as cancelled, so scripted
/// runs never spin on a wrong password. An empty answer at an interactive
/// prompt also cancels.
#[derive(Debug, Default)]
pub struct Prompter {
    env_current_used: bool,
    env_new_used: bool,
}

impl Prompter {
    pub fn current_password(&mut self, label: &str) -> Result<Dialog<CurrentPasswordForm>> {
        if let Some(pw) = env_password(PASSWORD_ENV) {
            if std::mem::replace(&mut self.env_current_used, true) {
                return Ok(Dialog::Cancelled);
            }
            return Ok(Dialog::Submitted(CurrentPasswordForm::new(pw.as_str())));
        }
        let pw = read_password(label)?;
        if pw.is_empty() {
            return Ok(Dialog::Cancelled);
        }
        Ok(Dialog::Submitted(CurrentPasswordForm::new(pw.as_str())))
    }

    pub fn new_password(&mut self) -> Result<Dialog<NewPasswordForm>> {
        if let Some(pw) = env_password(NEW_PASSWORD_ENV) {
            if std::mem::replace(&mut self.env_new_used, true) {
                return Ok(Dialog::Cancelled);
            }
            let confirm = env_password(NEW_PASSWORD_CONFIRM_ENV).unwrap_or_else(|| pw.clone());
            return Ok(Dialog::Submitted(NewPasswordForm::new(
                pw.as_str(),
                confirm.as_str(),
            )));
        }
        let first = read_password("New password")?;
        if first.is_empty() {
            return Ok(Dialog::Cancelled);
        }
        let second = read_password("Confirm new password")?;
        Ok(Dialog::Submitted(NewPasswordForm::new(
            first.as_str(),
            second.as_str(),
        )))
    }

    pub fn confirm(&mut self, question: &str, assume_yes: bool) -> Result<bool> {
        if assume_yes {
            return Ok(true);
        }
        let mut stdout = io::stdout();
        write!(stdout, "{question} [y/N] ")?;
        stdout.flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(matches!(
            line.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }
}

fn env_password(var: &str) -> Option<Zeroizing<String>> {
    std::env::var(var)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

fn read_password(label: &str) -> Result<Zeroizing<String>> {
    rpassword::prompt_password(format!("{label}: "))
        .map(Zeroizing::new)
        .map_err(|e| anyhow!("password prompt: {e}"))
}
