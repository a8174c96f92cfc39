//! `kdbx keyfile` — generate a new random keyfile.

use std::path::Path;

use crate::cli::output;
use crate::crypto::generate_keyfile;
use crate::errors::Result;

/// Execute the `keyfile` command.
pub fn execute(path: &Path) -> Result<()> {
    generate_keyfile(path)?;

    output::success(&format!("Keyfile generated at {}", path.display()));
    output::warning("Keep a backup; a database locked with it cannot be opened without it.");
    output::tip("Pass it with --keyfile when creating or opening a database.");
    Ok(())
}
