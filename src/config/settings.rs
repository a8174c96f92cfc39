use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::DEFAULT_TRANSFORM_ROUNDS;
use crate::errors::{KdbxError, Result};
use crate::format::{Compression, KdbxFormat, KdbxHeader, DEFAULT_MAX_TRANSFORM_ROUNDS};

/// Tool configuration, loaded from `.kdbx.toml`.
///
/// Every field has a default, so no config file is needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Compression for newly created databases.
    #[serde(default)]
    pub default_compression: Compression,

    /// AES-KDF rounds for newly created databases.
    #[serde(default = "default_transform_rounds")]
    pub transform_rounds: u64,

    /// Files asking for more rounds than this are refused.
    #[serde(default = "default_max_transform_rounds")]
    pub max_transform_rounds: u64,

    /// Log filter used when `KDBX_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_transform_rounds() -> u64 {
    DEFAULT_TRANSFORM_ROUNDS
}

fn default_max_transform_rounds() -> u64 {
    DEFAULT_MAX_TRANSFORM_ROUNDS
}

fn default_log_level() -> String {
    "warn".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_compression: Compression::default(),
            transform_rounds: default_transform_rounds(),
            max_transform_rounds: default_max_transform_rounds(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    const FILE_NAME: &'static str = ".kdbx.toml";

    /// Load settings from `<dir>/.kdbx.toml`.
    ///
    /// A missing file yields defaults; an unparsable one is an error.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;
        toml::from_str(&contents).map_err(|e| {
            KdbxError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })
    }

    /// A format pipeline honoring `max_transform_rounds`.
    pub fn format(&self) -> KdbxFormat {
        KdbxFormat::default().with_max_transform_rounds(self.max_transform_rounds)
    }

    /// A header for a new database with the configured parameters.
    pub fn new_header(&self) -> KdbxHeader {
        let mut header = KdbxHeader::create();
        header.compression = self.default_compression;
        header.transform_rounds = self.transform_rounds;
        header
    }
}

// ── Tests ────────────────────────────────────────────────────────────
