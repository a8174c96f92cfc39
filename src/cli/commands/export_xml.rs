//! `kdbx export-xml` — write the database as plain XML.

use std::path::Path;

use crate::cli::output;
use crate::cli::{open_database, write_atomic, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `export-xml` command.
pub fn execute(cli: &Cli, settings: &Settings, path: &Path, out: Option<&Path>) -> Result<()> {
    let mut db = open_database(cli, settings, path)?;
    let xml = zeroize::Zeroizing::new(settings.format().save_xml(&mut db)?);

    match out {
        Some(out) => {
            write_atomic(out, xml.as_bytes())?;
            output::warning("The export contains every password in clear text.");
            output::success(&format!("Exported to {}", out.display()));
        }
        None => print!("{}", xml.as_str()),
    }
    Ok(())
}
