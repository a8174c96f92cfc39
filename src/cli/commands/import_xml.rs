//! `kdbx import-xml` — build a new database from a plain XML export.

use std::fs;
use std::path::Path;

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{credentials, prompt_new_password, save_database, Cli};
use crate::config::Settings;
use crate::errors::{KdbxError, Result};

/// Execute the `import-xml` command.
pub fn execute(cli: &Cli, settings: &Settings, xml_path: &Path, path: &Path) -> Result<()> {
    if path.exists() {
        return Err(KdbxError::DatabaseAlreadyExists(path.to_path_buf()));
    }

    let text = Zeroizing::new(fs::read_to_string(xml_path)?);
    let password = prompt_new_password()?;
    let creds = credentials(cli, &password)?;

    let mut db = settings.format().load_xml(creds, &text)?;
    *db.header_mut() = settings.new_header();
    save_database(settings, &mut db, path)?;

    output::success(&format!(
        "Imported {} entr(ies) into {}",
        db.entries().len(),
        path.display()
    ));
    Ok(())
}
