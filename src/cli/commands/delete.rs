//! `kdbx delete` — remove an entry.

use std::path::Path;

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{open_database, save_database, Cli};
use crate::config::Settings;
use crate::errors::{KdbxError, Result};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, settings: &Settings, path: &Path, title: &str, force: bool) -> Result<()> {
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete entry '{title}'?"))
            .default(false)
            .interact()
            .map_err(|e| KdbxError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let mut db = open_database(cli, settings, path)?;
    db.remove_entry(title)?;
    save_database(settings, &mut db, path)?;

    output::success(&format!("Deleted entry '{title}'"));
    Ok(())
}
