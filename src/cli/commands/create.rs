//! `kdbx create` — create a new empty database.

use std::path::Path;

use crate::cli::output;
use crate::cli::{credentials, prompt_new_password, save_database, Cli};
use crate::config::Settings;
use crate::errors::{KdbxError, Result};
use crate::format::Compression;
use crate::model::Database;

/// Execute the `create` command.
pub fn execute(
    cli: &Cli,
    settings: &Settings,
    path: &Path,
    name: Option<&str>,
    compression: Option<Compression>,
    rounds: Option<u64>,
) -> Result<()> {
    if path.exists() {
        output::tip("Use `kdbx set` to add entries to the existing database.");
        return Err(KdbxError::DatabaseAlreadyExists(path.to_path_buf()));
    }

    let password = prompt_new_password()?;
    let creds = credentials(cli, &password)?;

    let default_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Database".to_string());
    let name = name.unwrap_or(&default_name);

    let mut db = Database::create(creds, name);
    *db.header_mut() = settings.new_header();
    if let Some(compression) = compression {
        db.header_mut().compression = compression;
    }
    if let Some(rounds) = rounds {
        db.header_mut().transform_rounds = rounds;
    }

    save_database(settings, &mut db, path)?;

    if cli.keyfile.is_some() {
        output::info("Database created with a keyfile; pass --keyfile on every command.");
    }
    output::success(&format!("Database '{name}' created at {}", path.display()));
    output::tip("Run `kdbx set <FILE> <TITLE>` to add an entry.");

    Ok(())
}
