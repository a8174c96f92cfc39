//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::crypto::{load_keyfile, Credentials};
use crate::errors::{KdbxError, Result};
use crate::format::Compression;
use crate::model::Database;

/// Environment variable checked for the database password.
pub const PASSWORD_ENV: &str = "KDBX_PASSWORD";

/// kdbx: read and write KeePass 2.x (KDBX 3.1) password databases.
#[derive(Parser)]
#[command(name = "kdbx", about = "KeePass KDBX 3.1 database tool", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Keyfile used as an additional credential factor
    #[arg(long, global = true)]
    pub keyfile: Option<PathBuf>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new empty database
    Create {
        /// Database file to create
        file: PathBuf,
        /// Database name (default: file stem)
        #[arg(long)]
        name: Option<String>,
        /// Body compression: none or gzip (default from config)
        #[arg(long)]
        compression: Option<Compression>,
        /// AES-KDF transform rounds (default from config)
        #[arg(long)]
        rounds: Option<u64>,
    },

    /// Show the cleartext header (no password needed)
    Info {
        /// Database file
        file: PathBuf,
    },

    /// List all entries
    List {
        /// Database file
        file: PathBuf,
    },

    /// Print one field of an entry
    Get {
        /// Database file
        file: PathBuf,
        /// Entry title
        title: String,
        /// Field to print
        #[arg(short, long, default_value = "Password")]
        field: String,
    },

    /// Add or update an entry
    Set {
        /// Database file
        file: PathBuf,
        /// Entry title
        title: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Entry password (prompted for if omitted on a new entry)
        #[arg(long)]
        password: Option<String>,
    },

    /// Delete an entry
    Delete {
        /// Database file
        file: PathBuf,
        /// Entry title
        title: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Export the database as plain XML (protected values in the clear)
    ExportXml {
        /// Database file
        file: PathBuf,
        /// Output file (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a new database from a plain XML export
    ImportXml {
        /// XML file to import
        xml: PathBuf,
        /// Database file to create
        file: PathBuf,
    },

    /// Generate a new random keyfile
    Keyfile {
        /// Path for the keyfile
        path: PathBuf,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Get the database password from `KDBX_PASSWORD` or an interactive
/// prompt.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter database password")
        .interact()
        .map_err(|e| KdbxError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password with confirmation.  `KDBX_PASSWORD` is
/// used as-is when set.
pub fn prompt_new_password() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Choose database password")
        .with_confirmation("Confirm password", "Passwords do not match, try again")
        .allow_empty_password(true)
        .interact()
        .map_err(|e| KdbxError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Combine the password with the `--keyfile` factor, if any.  An empty
/// password is no factor at all.
pub fn credentials(cli: &Cli, password: &str) -> Result<Credentials> {
    let keyfile = match &cli.keyfile {
        Some(path) => Some(load_keyfile(path)?),
        None => None,
    };
    let password = (!password.is_empty()).then_some(password.as_bytes());
    Credentials::new(password, keyfile.as_ref().map(|k| k.as_slice()))
}

/// Read a database file, mapping a missing file to `DatabaseNotFound`.
pub fn read_database(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(KdbxError::DatabaseNotFound(path.to_path_buf()));
    }
    Ok(fs::read(path)?)
}

/// Prompt for credentials and open the database at `path`.
pub fn open_database(cli: &Cli, settings: &Settings, path: &Path) -> Result<Database> {
    let data = read_database(path)?;
    let password = prompt_password()?;
    let creds = credentials(cli, &password)?;
    settings.format().load(creds, &data)
}

/// Encrypt `db` and write it to `path`.
pub fn save_database(settings: &Settings, db: &mut Database, path: &Path) -> Result<()> {
    let bytes = settings.format().save(db)?;
    write_atomic(path, &bytes)
}

/// Write to a temp file beside `path`, then rename over it.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| KdbxError::CommandFailed(format!("not a file path: {}", path.display())))?;
    let tmp_path = parent.join(format!(".{}.tmp", file_name.to_string_lossy()));

    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli_with_keyfile(keyfile: Option<PathBuf>) -> Cli {
        Cli {
            command: Commands::Info {
                file: PathBuf::from("db.kdbx"),
            },
            keyfile,
        }
    }

    #[test]
    fn cli_parses_global_keyfile() {
        let cli = Cli::parse_from(["kdbx", "list", "db.kdbx", "--keyfile", "k.key"]);
        assert_eq!(cli.keyfile, Some(PathBuf::from("k.key")));
        assert!(matches!(cli.command, Commands::List { .. }));
    }

    #[test]
    fn cli_parses_compression() {
        let cli = Cli::parse_from(["kdbx", "create", "db.kdbx", "--compression", "none"]);
        match cli.command {
            Commands::Create { compression, .. } => assert_eq!(compression, Some(Compression::None)),
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn empty_password_without_keyfile_is_not_ready() {
        use crate::crypto::CompositeKey;
        let creds = credentials(&cli_with_keyfile(None), "").unwrap();
        assert!(creds.ready().is_err());
    }

    #[test]
    fn keyfile_is_loaded() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("k.key");
        fs::write(&path, [5u8; 32]).unwrap();
        let creds = credentials(&cli_with_keyfile(Some(path)), "pw").unwrap();
        assert!(creds.has_keyfile());
    }

    #[test]
    fn missing_database_is_reported() {
        let tmp = TempDir::new().unwrap();
        let err = read_database(&tmp.path().join("none.kdbx")).unwrap_err();
        assert!(matches!(err, KdbxError::DatabaseNotFound(_)));
    }

    #[test]
    fn atomic_write_replaces_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("db.kdbx");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"two");
        assert!(!tmp.path().join(".db.kdbx.tmp").exists());
    }
}
