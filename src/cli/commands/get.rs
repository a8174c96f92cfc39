//! `kdbx get` — print one field of an entry.

use std::path::Path;

use crate::cli::{open_database, Cli};
use crate::config::Settings;
use crate::errors::{KdbxError, Result};

/// Execute the `get` command.
pub fn execute(cli: &Cli, settings: &Settings, path: &Path, title: &str, field: &str) -> Result<()> {
    let db = open_database(cli, settings, path)?;

    let entry = db
        .find_entry(title)
        .ok_or_else(|| KdbxError::EntryNotFound(title.to_string()))?;
    let value = entry.field(field).ok_or_else(|| {
        KdbxError::CommandFailed(format!("entry '{title}' has no field '{field}'"))
    })?;

    println!("{}", value.reveal().as_str());
    Ok(())
}
