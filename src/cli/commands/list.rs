//! `kdbx list` — display all entries in a table.

use std::path::Path;

use crate::cli::output;
use crate::cli::{open_database, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli, settings: &Settings, path: &Path) -> Result<()> {
    let db = open_database(cli, settings, path)?;
    let entries = db.entries();

    let name = db.meta().database_name.as_deref().unwrap_or("database");
    output::info(&format!("{name}: {} entr(ies)", entries.len()));
    output::print_entries_table(&entries);

    Ok(())
}
