//! `kdbx set` — add or update an entry.

use std::path::Path;

use crate::cli::output;
use crate::cli::{open_database, save_database, Cli};
use crate::config::Settings;
use crate::errors::{KdbxError, Result};
use crate::model::entry::{NOTES, PASSWORD, URL, USERNAME};
use crate::model::Entry;

/// Field values passed on the command line.
pub struct EntryFields<'a> {
    pub username: Option<&'a str>,
    pub url: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub password: Option<&'a str>,
}

/// Execute the `set` command.
pub fn execute(
    cli: &Cli,
    settings: &Settings,
    path: &Path,
    title: &str,
    fields: &EntryFields<'_>,
) -> Result<()> {
    if fields.password.is_some() {
        output::warning("Password provided on command line — it may appear in shell history.");
    }

    let mut db = open_database(cli, settings, path)?;

    let existing = db.find_entry(title);
    let existed = existing.is_some();
    let mut entry = existing.unwrap_or_else(|| Entry::new(title));

    for (key, value) in [
        (USERNAME, fields.username),
        (URL, fields.url),
        (NOTES, fields.notes),
    ] {
        if let Some(value) = value {
            entry.set_field(key, value);
        }
    }

    match fields.password {
        Some(pw) => entry.set_field(PASSWORD, pw),
        None if !existed => {
            let pw = dialoguer::Password::new()
                .with_prompt(format!("Password for {title}"))
                .allow_empty_password(true)
                .interact()
                .map_err(|e| KdbxError::CommandFailed(format!("input prompt: {e}")))?;
            entry.set_field(PASSWORD, &zeroize::Zeroizing::new(pw));
        }
        None => {}
    }

    db.upsert_entry(&entry)?;
    save_database(settings, &mut db, path)?;

    let verb = if existed { "updated" } else { "added" };
    output::success(&format!(
        "Entry '{title}' {verb} ({} total)",
        db.entries().len()
    ));
    Ok(())
}
