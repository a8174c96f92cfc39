use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur while reading or writing a KDBX database.
#[derive(Debug, Error)]
pub enum KdbxError {
    // --- Format errors ---
    #[error("File corrupt: {0}")]
    FileCorrupt(String),

    #[error("Invalid key — wrong password or keyfile")]
    InvalidKey,

    #[error("Bad signature — not a KDBX database")]
    BadSignature,

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    // --- Crypto errors ---
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    // --- Keyfile errors ---
    #[error("Keyfile error: {0}")]
    KeyfileError(String),

    // --- Database errors ---
    #[error("Database not found at {0}")]
    DatabaseNotFound(PathBuf),

    #[error("Database already exists at {0}")]
    DatabaseAlreadyExists(PathBuf),

    #[error("Entry '{0}' not found")]
    EntryNotFound(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

impl KdbxError {
    /// Shorthand used by parsers that reject malformed input.
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        KdbxError::FileCorrupt(msg.into())
    }
}

/// Convenience type alias for KDBX results.
pub type Result<T> = std::result::Result<T, KdbxError>;
