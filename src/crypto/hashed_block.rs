//! Hashed-block framing of the decrypted body.
//!
//! The payload is cut into blocks, each carrying the SHA-256 of its
//! data, so corruption inside the ciphertext is caught even when the
//! outer decryption happens to succeed:
//!
//! ```text
//! [index: u32 LE][sha256(data): 32 bytes][size: u32 LE][data: size bytes]
//! ...
//! [index: u32 LE][32 zero bytes][0u32]   <- terminator
//! ```

use subtle::ConstantTimeEq;

use super::hash::{sha256, HASH_LEN};
use crate::errors::{KdbxError, Result};

/// Default block payload size (1 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

/// Fixed per-block overhead: index + hash + size.
const BLOCK_HEADER_LEN: usize = 4 + HASH_LEN + 4;

/// Frame `data` using the default block size.
pub fn encode(data: &[u8]) -> Vec<u8> {
    encode_with_block_size(data, DEFAULT_BLOCK_SIZE)
}

/// Frame `data` into blocks of at most `block_size` bytes.
///
/// # Panics
/// Panics if `block_size` is zero or does not fit in a `u32`.
pub fn encode_with_block_size(data: &[u8], block_size: usize) -> Vec<u8> {
    assert!(block_size > 0 && u32::try_from(block_size).is_ok());

    let block_count = data.len().div_ceil(block_size);
    let mut out = Vec::with_capacity(data.len() + (block_count + 1) * BLOCK_HEADER_LEN);

    let mut index: u32 = 0;
    for chunk in data.chunks(block_size) {
        out.extend_from_slice(&index.to_le_bytes());
        out.extend_from_slice(&sha256(chunk));
        // chunk.len() <= block_size, which was checked to fit in u32
        out.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
        out.extend_from_slice(chunk);
        index = index.wrapping_add(1);
    }

    out.extend_from_slice(&index.to_le_bytes());
    out.extend_from_slice(&[0u8; HASH_LEN]);
    out.extend_from_slice(&0u32.to_le_bytes());
    out
}

/// Verify every block of `framed` and return the reassembled payload.
pub fn decode(framed: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(framed.len());
    let mut pos = 0usize;
    let mut expected_index: u32 = 0;

    loop {
        let header = framed.get(pos..pos + BLOCK_HEADER_LEN).ok_or_else(|| {
            KdbxError::corrupt(format!("truncated block header at block {expected_index}"))
        })?;
        pos += BLOCK_HEADER_LEN;

        let index = read_u32(&header[..4]);
        let hash = &header[4..4 + HASH_LEN];
        let size = read_u32(&header[4 + HASH_LEN..]) as usize;

        if index != expected_index {
            return Err(KdbxError::corrupt(format!(
                "block index mismatch: expected {expected_index}, found {index}"
            )));
        }

        if size == 0 {
            if hash.iter().any(|b| *b != 0) {
                return Err(KdbxError::corrupt("non-zero hash on final block"));
            }
            break;
        }

        let data = pos
            .checked_add(size)
            .and_then(|end| framed.get(pos..end))
            .ok_or_else(|| KdbxError::corrupt(format!("truncated data in block {index}")))?;
        pos += size;

        if !bool::from(sha256(data)[..].ct_eq(hash)) {
            return Err(KdbxError::corrupt(format!("hash mismatch in block {index}")));
        }

        out.extend_from_slice(data);
        expected_index = expected_index.wrapping_add(1);
    }

    Ok(out)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_is_only_a_terminator() {
        let framed = encode(b"");
        assert_eq!(framed.len(), BLOCK_HEADER_LEN);
        assert_eq!(decode(&framed).unwrap(), b"");
    }

    #[test]
    fn multi_block_roundtrip() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let framed = encode_with_block_size(&data, 64);
        // 16 data blocks (15 full, 1 partial) + terminator
        assert_eq!(framed.len(), data.len() + 17 * BLOCK_HEADER_LEN);
        assert_eq!(decode(&framed).unwrap(), data);
    }

    #[test]
    fn flipped_data_byte_is_detected() {
        let mut framed = encode(b"<KeePassFile/>");
        framed[BLOCK_HEADER_LEN] ^= 0x01;
        let err = decode(&framed).unwrap_err();
        assert!(matches!(err, KdbxError::FileCorrupt(msg) if msg.contains("hash mismatch")));
    }

    #[test]
    fn wrong_block_index_is_detected() {
        let mut framed = encode(b"payload");
        framed[0] = 5;
        assert!(matches!(decode(&framed), Err(KdbxError::FileCorrupt(_))));
    }

    #[test]
    fn missing_terminator_is_detected() {
        let framed = encode(b"payload");
        let cut = &framed[..framed.len() - BLOCK_HEADER_LEN];
        assert!(matches!(decode(cut), Err(KdbxError::FileCorrupt(_))));
    }

    #[test]
    fn truncated_block_data_is_detected() {
        let framed = encode(b"payload");
        assert!(matches!(
            decode(&framed[..BLOCK_HEADER_LEN + 3]),
            Err(KdbxError::FileCorrupt(_))
        ));
    }

    #[test]
    fn trailing_bytes_after_terminator_are_ignored() {
        let mut framed = encode(b"payload");
        framed.extend_from_slice(&[0xAA; 5]);
        assert_eq!(decode(&framed).unwrap(), b"payload");
    }
}
