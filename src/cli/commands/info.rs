//! `kdbx info` — show the cleartext header without opening the database.

use std::path::Path;

use crate::cli::{output, read_database};
use crate::errors::Result;
use crate::format::{BinaryStream, KdbxHeader};

/// Execute the `info` command.
pub fn execute(path: &Path) -> Result<()> {
    let data = read_database(path)?;
    let mut stm = BinaryStream::from_bytes(&data);
    let header = KdbxHeader::read(&mut stm)?;

    let mut rows = vec![
        (
            "Version",
            format!("{}.{}", header.version_major, header.version_minor),
        ),
        ("Cipher", "AES-256-CBC".to_string()),
        ("Compression", header.compression.to_string()),
        ("Transform rounds", header.transform_rounds.to_string()),
        ("Start marker", format!("{} bytes", header.stream_start_bytes.len())),
        ("Header size", format!("{} bytes", header.end_pos)),
        (
            "Body size",
            format!("{} bytes", data.len().saturating_sub(header.end_pos)),
        ),
    ];
    if let Some(comment) = &header.comment {
        rows.push(("Comment", String::from_utf8_lossy(comment).into_owned()));
    }

    output::info(&format!("{}", path.display()));
    output::print_properties(&rows);
    Ok(())
}
