//! KDBX 3.1 cleartext header.
//!
//! Layout:
//!
//! ```text
//! [sig1: u32 LE][sig2: u32 LE][minor: u16 LE][major: u16 LE]
//! [id: u8][len: u16 LE][data: len bytes]   repeated until id == 0
//! ```
//!
//! The header is read before any key material exists, so everything
//! here is public: seeds, IV, and rounds are stored in the clear.
//! `end_pos` records where the serialized header stops; the header hash
//! is computed over exactly `0..end_pos` of the original bytes.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::stream::BinaryStream;
use crate::crypto::kdf::DEFAULT_TRANSFORM_ROUNDS;
use crate::errors::{KdbxError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const SIGNATURE_1: u32 = 0x9AA2_D903;
pub const SIGNATURE_2: u32 = 0xB54B_FB67;

/// Only major version 3 is understood.
pub const VERSION_MAJOR: u16 = 3;
pub const VERSION_MINOR: u16 = 1;

/// UUID of the AES-256 body cipher.
pub const AES_CIPHER_ID: [u8; 16] = [
    0x31, 0xC1, 0xF2, 0xE6, 0xBF, 0x71, 0x43, 0x50, 0xBE, 0x58, 0x05, 0x21, 0x6A, 0xFC, 0x5A, 0xFF,
];

/// Inner random stream id for Salsa20.
pub const SALSA20_STREAM_ID: u32 = 2;

const MASTER_SEED_LEN: usize = 32;
const TRANSFORM_SEED_LEN: usize = 32;
const ENCRYPTION_IV_LEN: usize = 16;
const PROTECTED_STREAM_KEY_LEN: usize = 32;
const STREAM_START_BYTES_LEN: usize = 32;

const END_OF_HEADER_DATA: &[u8] = b"\r\n\r\n";

/// Header field ids.
mod field {
    pub const END_OF_HEADER: u8 = 0;
    pub const COMMENT: u8 = 1;
    pub const CIPHER_ID: u8 = 2;
    pub const COMPRESSION_FLAGS: u8 = 3;
    pub const MASTER_SEED: u8 = 4;
    pub const TRANSFORM_SEED: u8 = 5;
    pub const TRANSFORM_ROUNDS: u8 = 6;
    pub const ENCRYPTION_IV: u8 = 7;
    pub const PROTECTED_STREAM_KEY: u8 = 8;
    pub const STREAM_START_BYTES: u8 = 9;
    pub const INNER_RANDOM_STREAM_ID: u8 = 10;
}

// ---------------------------------------------------------------------------
// Compression
// ---------------------------------------------------------------------------

/// Compression applied to the body before block framing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    #[default]
    GZip,
}

impl Compression {
    fn from_flags(flags: u32) -> Result<Self> {
        match flags {
            0 => Ok(Compression::None),
            1 => Ok(Compression::GZip),
            other => Err(KdbxError::Unsupported(format!("compression algorithm {other}"))),
        }
    }

    fn flags(self) -> u32 {
        match self {
            Compression::None => 0,
            Compression::GZip => 1,
        }
    }
}

impl FromStr for Compression {
    type Err = KdbxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "gzip" => Ok(Compression::GZip),
            other => Err(KdbxError::ConfigError(format!(
                "unknown compression '{other}' (use 'none' or 'gzip')"
            ))),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => f.write_str("none"),
            Compression::GZip => f.write_str("gzip"),
        }
    }
}

// ---------------------------------------------------------------------------
// KdbxHeader
// ---------------------------------------------------------------------------

/// Parsed (or freshly created) database header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdbxHeader {
    pub version_major: u16,
    pub version_minor: u16,
    pub cipher_id: [u8; 16],
    pub compression: Compression,
    pub master_seed: Vec<u8>,
    pub transform_seed: Vec<u8>,
    pub transform_rounds: u64,
    pub encryption_iv: Vec<u8>,
    pub protected_stream_key: Vec<u8>,
    /// Known plaintext placed in front of the body (the start marker).
    pub stream_start_bytes: Vec<u8>,
    pub inner_random_stream_id: u32,
    pub comment: Option<Vec<u8>>,
    /// Byte offset where the serialized header ends.
    pub end_pos: usize,
}

impl KdbxHeader {
    /// A header with default parameters and no salts yet.
    ///
    /// Salts are filled by `generate_salts`, which every save calls.
    pub fn create() -> Self {
        Self {
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            cipher_id: AES_CIPHER_ID,
            compression: Compression::default(),
            master_seed: Vec::new(),
            transform_seed: Vec::new(),
            transform_rounds: DEFAULT_TRANSFORM_ROUNDS,
            encryption_iv: Vec::new(),
            protected_stream_key: Vec::new(),
            stream_start_bytes: Vec::new(),
            inner_random_stream_id: SALSA20_STREAM_ID,
            comment: None,
            end_pos: 0,
        }
    }

    /// Fill every seed, the IV, the protected stream key, and the start
    /// marker with fresh random bytes.
    ///
    /// The start marker keeps its current length (32 bytes if unset).
    pub fn generate_salts<R: RngCore + ?Sized>(&mut self, rng: &mut R) {
        let marker_len = match self.stream_start_bytes.len() {
            0 => STREAM_START_BYTES_LEN,
            n => n,
        };
        self.master_seed = random_bytes(rng, MASTER_SEED_LEN);
        self.transform_seed = random_bytes(rng, TRANSFORM_SEED_LEN);
        self.encryption_iv = random_bytes(rng, ENCRYPTION_IV_LEN);
        self.protected_stream_key = random_bytes(rng, PROTECTED_STREAM_KEY_LEN);
        self.stream_start_bytes = random_bytes(rng, marker_len);
    }

    /// Parse a header from the start of `stm`, leaving the stream
    /// positioned at the first body byte.
    pub fn read(stm: &mut BinaryStream) -> Result<Self> {
        if stm.read_u32()? != SIGNATURE_1 || stm.read_u32()? != SIGNATURE_2 {
            return Err(KdbxError::BadSignature);
        }

        let version_minor = stm.read_u16()?;
        let version_major = stm.read_u16()?;
        if version_major != VERSION_MAJOR {
            return Err(KdbxError::InvalidVersion(format!(
                "{version_major}.{version_minor}, expected {VERSION_MAJOR}.x"
            )));
        }

        let mut header = Self::create();
        header.version_major = version_major;
        header.version_minor = version_minor;
        header.compression = Compression::None;
        let mut seen_cipher = false;

        loop {
            let id = stm.read_u8()?;
            let len = usize::from(stm.read_u16()?);
            let data = stm.read_bytes(len)?;

            match id {
                field::END_OF_HEADER => break,
                field::COMMENT => header.comment = Some(data.to_vec()),
                field::CIPHER_ID => {
                    if data != AES_CIPHER_ID {
                        return Err(KdbxError::Unsupported(format!(
                            "cipher {}",
                            hex::encode(data)
                        )));
                    }
                    seen_cipher = true;
                }
                field::COMPRESSION_FLAGS => {
                    header.compression = Compression::from_flags(le_u32(id, data)?)?;
                }
                field::MASTER_SEED => header.master_seed = data.to_vec(),
                field::TRANSFORM_SEED => header.transform_seed = data.to_vec(),
                field::TRANSFORM_ROUNDS => header.transform_rounds = le_u64(id, data)?,
                field::ENCRYPTION_IV => header.encryption_iv = data.to_vec(),
                field::PROTECTED_STREAM_KEY => header.protected_stream_key = data.to_vec(),
                field::STREAM_START_BYTES => header.stream_start_bytes = data.to_vec(),
                field::INNER_RANDOM_STREAM_ID => {
                    let stream_id = le_u32(id, data)?;
                    if stream_id != SALSA20_STREAM_ID {
                        return Err(KdbxError::Unsupported(format!(
                            "inner random stream {stream_id}"
                        )));
                    }
                    header.inner_random_stream_id = stream_id;
                }
                other => warn!(id = other, len, "skipping unknown header field"),
            }
        }

        header.end_pos = stm.position();

        if !seen_cipher {
            return Err(KdbxError::corrupt("missing header field: cipher id"));
        }
        check_len("master seed", &header.master_seed, MASTER_SEED_LEN)?;
        check_len("transform seed", &header.transform_seed, TRANSFORM_SEED_LEN)?;
        check_len("encryption IV", &header.encryption_iv, ENCRYPTION_IV_LEN)?;
        if header.protected_stream_key.is_empty() {
            return Err(KdbxError::corrupt("missing header field: protected stream key"));
        }
        if header.stream_start_bytes.is_empty() {
            return Err(KdbxError::corrupt("missing header field: stream start bytes"));
        }

        debug!(
            end_pos = header.end_pos,
            rounds = header.transform_rounds,
            compression = %header.compression,
            "header parsed"
        );
        Ok(header)
    }

    /// Serialize the header to `stm` and record `end_pos`.
    pub fn write(&mut self, stm: &mut BinaryStream) -> Result<()> {
        stm.write_u32(SIGNATURE_1);
        stm.write_u32(SIGNATURE_2);
        stm.write_u16(self.version_minor);
        stm.write_u16(self.version_major);

        if let Some(comment) = &self.comment {
            write_field(stm, field::COMMENT, comment)?;
        }
        write_field(stm, field::CIPHER_ID, &self.cipher_id)?;
        write_field(stm, field::COMPRESSION_FLAGS, &self.compression.flags().to_le_bytes())?;
        write_field(stm, field::MASTER_SEED, &self.master_seed)?;
        write_field(stm, field::TRANSFORM_SEED, &self.transform_seed)?;
        write_field(stm, field::TRANSFORM_ROUNDS, &self.transform_rounds.to_le_bytes())?;
        write_field(stm, field::ENCRYPTION_IV, &self.encryption_iv)?;
        write_field(stm, field::PROTECTED_STREAM_KEY, &self.protected_stream_key)?;
        write_field(stm, field::STREAM_START_BYTES, &self.stream_start_bytes)?;
        write_field(
            stm,
            field::INNER_RANDOM_STREAM_ID,
            &self.inner_random_stream_id.to_le_bytes(),
        )?;
        write_field(stm, field::END_OF_HEADER, END_OF_HEADER_DATA)?;

        self.end_pos = stm.position();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn random_bytes<R: RngCore + ?Sized>(rng: &mut R, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rng.fill_bytes(&mut buf);
    buf
}

fn write_field(stm: &mut BinaryStream, id: u8, data: &[u8]) -> Result<()> {
    let len = u16::try_from(data.len()).map_err(|_| {
        KdbxError::EncryptionFailed(format!("header field {id} is too long: {} bytes", data.len()))
    })?;
    stm.write_u8(id);
    stm.write_u16(len);
    stm.write_bytes(data);
    Ok(())
}

fn le_u32(id: u8, data: &[u8]) -> Result<u32> {
    let bytes: [u8; 4] = data
        .try_into()
        .map_err(|_| KdbxError::corrupt(format!("header field {id}: expected 4 bytes")))?;
    Ok(u32::from_le_bytes(bytes))
}

fn le_u64(id: u8, data: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = data
        .try_into()
        .map_err(|_| KdbxError::corrupt(format!("header field {id}: expected 8 bytes")))?;
    Ok(u64::from_le_bytes(bytes))
}

fn check_len(name: &str, data: &[u8], expected: usize) -> Result<()> {
    if data.len() != expected {
        return Err(KdbxError::corrupt(format!(
            "{name} must be {expected} bytes, got {}",
            data.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn salted() -> KdbxHeader {
        let mut header = KdbxHeader::create();
        header.generate_salts(&mut StdRng::seed_from_u64(7));
        header
    }

    fn serialize(header: &mut KdbxHeader) -> Vec<u8> {
        let mut stm = BinaryStream::new();
        header.write(&mut stm).unwrap();
        stm.into_bytes()
    }

    #[test]
    fn write_then_read_roundtrip() {
        let mut header = salted();
        header.comment = Some(b"hello".to_vec());
        let bytes = serialize(&mut header);
        assert_eq!(header.end_pos, bytes.len());

        let mut stm = BinaryStream::from_bytes(&bytes);
        let parsed = KdbxHeader::read(&mut stm).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(stm.position(), bytes.len());
    }

    #[test]
    fn end_pos_stops_before_body() {
        let mut header = salted();
        let mut bytes = serialize(&mut header);
        bytes.extend_from_slice(b"BODY");

        let mut stm = BinaryStream::from_bytes(&bytes);
        let parsed = KdbxHeader::read(&mut stm).unwrap();
        assert_eq!(parsed.end_pos, bytes.len() - 4);
        assert_eq!(stm.read_bytes_to_end(), b"BODY");
    }

    #[test]
    fn generate_salts_sizes_and_freshness() {
        let mut header = KdbxHeader::create();
        header.generate_salts(&mut StdRng::seed_from_u64(1));
        assert_eq!(header.master_seed.len(), 32);
        assert_eq!(header.transform_seed.len(), 32);
        assert_eq!(header.encryption_iv.len(), 16);
        assert_eq!(header.protected_stream_key.len(), 32);
        assert_eq!(header.stream_start_bytes.len(), 32);

        let before = header.clone();
        header.generate_salts(&mut StdRng::seed_from_u64(2));
        assert_ne!(header.master_seed, before.master_seed);
        assert_ne!(header.encryption_iv, before.encryption_iv);
    }

    #[test]
    fn generate_salts_keeps_marker_length() {
        let mut header = KdbxHeader::create();
        header.stream_start_bytes = vec![0u8; 16];
        header.generate_salts(&mut StdRng::seed_from_u64(3));
        assert_eq!(header.stream_start_bytes.len(), 16);
    }

    #[test]
    fn bad_signature_is_rejected() {
        let mut bytes = serialize(&mut salted());
        bytes[0] ^= 0xFF;
        let err = KdbxHeader::read(&mut BinaryStream::from_bytes(&bytes)).unwrap_err();
        assert!(matches!(err, KdbxError::BadSignature));
    }

    #[test]
    fn wrong_major_version_is_rejected() {
        let mut bytes = serialize(&mut salted());
        bytes[10] = 4;
        let err = KdbxHeader::read(&mut BinaryStream::from_bytes(&bytes)).unwrap_err();
        assert!(matches!(err, KdbxError::InvalidVersion(_)));
    }

    #[test]
    fn truncated_header_is_corrupt() {
        let bytes = serialize(&mut salted());
        let err = KdbxHeader::read(&mut BinaryStream::from_bytes(&bytes[..40])).unwrap_err();
        assert!(matches!(err, KdbxError::FileCorrupt(_)));
    }

    #[test]
    fn missing_master_seed_is_corrupt() {
        let mut header = salted();
        header.master_seed = vec![1, 2, 3];
        let bytes = serialize(&mut header);
        let err = KdbxHeader::read(&mut BinaryStream::from_bytes(&bytes)).unwrap_err();
        assert!(matches!(err, KdbxError::FileCorrupt(msg) if msg.contains("master seed")));
    }

    #[test]
    fn unknown_cipher_is_unsupported() {
        let mut header = salted();
        header.cipher_id = [0xAA; 16];
        let bytes = serialize(&mut header);
        let err = KdbxHeader::read(&mut BinaryStream::from_bytes(&bytes)).unwrap_err();
        assert!(matches!(err, KdbxError::Unsupported(_)));
    }

    #[test]
    fn compression_parses_from_str() {
        assert_eq!("gzip".parse::<Compression>().unwrap(), Compression::GZip);
        assert_eq!("None".parse::<Compression>().unwrap(), Compression::None);
        assert!("zstd".parse::<Compression>().is_err());
    }
}
