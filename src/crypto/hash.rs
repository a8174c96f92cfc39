//! SHA-256 helpers.
//!
//! Digests are written into caller-owned buffers so the caller decides
//! when (and whether) the result is wiped.

use sha2::digest::generic_array::GenericArray;
use sha2::{Digest, Sha256};

/// Length of a SHA-256 digest in bytes.
pub const HASH_LEN: usize = 32;

/// Hash `data` into `out`.
pub fn sha256_into(data: &[u8], out: &mut [u8; HASH_LEN]) {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize_into(GenericArray::from_mut_slice(out));
}

/// Hash `data` and return the digest.
///
/// Only for values that are not secret (header bytes, block payloads).
pub fn sha256(data: &[u8]) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    sha256_into(data, &mut out);
    out
}
