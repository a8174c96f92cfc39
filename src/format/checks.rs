//! Tamper detection around the decrypted body.
//!
//! Two independent checks:
//! - the start marker, a known plaintext prefix that catches a wrong
//!   key before any block verification work is done;
//! - the header hash, SHA-256 over the raw header bytes recorded in the
//!   document at save time and re-checked after load.

use subtle::ConstantTimeEq;

use crate::crypto::hash::{sha256, HASH_LEN};
use crate::errors::{KdbxError, Result};

/// Check that `plaintext` starts with `marker` and return the rest.
///
/// A plaintext shorter than the marker is corrupt; a same-length
/// mismatch is reported as a wrong key, even though header corruption
/// can produce it too.
pub fn strip_start_marker<'a>(plaintext: &'a [u8], marker: &[u8]) -> Result<&'a [u8]> {
    if plaintext.len() < marker.len() {
        return Err(KdbxError::corrupt("short start bytes"));
    }

    let (head, rest) = plaintext.split_at(marker.len());
    if !bool::from(head.ct_eq(marker)) {
        return Err(KdbxError::InvalidKey);
    }
    Ok(rest)
}

/// SHA-256 of the serialized header bytes.
pub fn header_hash(header_bytes: &[u8]) -> [u8; HASH_LEN] {
    sha256(header_bytes)
}

/// Compare a recorded header hash with the hash of the raw header
/// bytes actually read from the input.
pub fn verify_header_hash(recorded: &[u8], header_bytes: &[u8]) -> Result<()> {
    let actual = header_hash(header_bytes);
    if !bool::from(actual[..].ct_eq(recorded)) {
        return Err(KdbxError::corrupt("header hash mismatch"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_is_stripped() {
        let rest = strip_start_marker(b"MARKbody", b"MARK").unwrap();
        assert_eq!(rest, b"body");
    }

    #[test]
    fn exact_marker_leaves_nothing() {
        assert!(strip_start_marker(b"MARK", b"MARK").unwrap().is_empty());
    }

    #[test]
    fn short_plaintext_is_corrupt() {
        let err = strip_start_marker(b"MA", b"MARK").unwrap_err();
        assert!(matches!(err, KdbxError::FileCorrupt(_)));
    }

    #[test]
    fn wrong_marker_is_invalid_key() {
        let err = strip_start_marker(b"MARXbody", b"MARK").unwrap_err();
        assert!(matches!(err, KdbxError::InvalidKey));
    }

    #[test]
    fn header_hash_verifies() {
        let bytes = b"header bytes";
        let recorded = header_hash(bytes);
        assert!(verify_header_hash(&recorded, bytes).is_ok());
    }

    #[test]
    fn flipped_header_byte_is_corrupt() {
        let recorded = header_hash(b"header bytes");
        let err = verify_header_hash(&recorded, b"header bytez").unwrap_err();
        assert!(matches!(err, KdbxError::FileCorrupt(_)));
    }

    #[test]
    fn short_recorded_hash_is_corrupt() {
        let recorded = header_hash(b"header bytes");
        assert!(verify_header_hash(&recorded[..16], b"header bytes").is_err());
    }
}
