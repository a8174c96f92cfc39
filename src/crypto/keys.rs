//! Master key derivation.
//!
//! The master key binds the credentials to one particular save of one
//! particular file:
//!
//! ```text
//! composite  = credentials.composite_hash()
//! stretched  = stretch(composite, header.transform_seed, header.transform_rounds)
//! key_hash   = SHA-256(stretched)
//! master_key = SHA-256(header.master_seed || key_hash)
//! ```
//!
//! Every intermediate lives in a `DerivationScratch` and is wiped right
//! after its last read.  The scratch is also zeroized on drop, so an
//! early `?` return leaves nothing behind either.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::credentials::CompositeKey;
use super::hash::sha256_into;
use super::kdf::KeyStretcher;
use crate::errors::Result;
use crate::format::KdbxHeader;

/// Length of the master key (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// A wrapper around the 32-byte master key that automatically zeroes
/// its memory when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Create a new `MasterKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes (e.g. to key the body cipher).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

/// Single-use buffers for one derivation.
#[derive(Default, Zeroize, ZeroizeOnDrop)]
struct DerivationScratch {
    composite: [u8; KEY_LEN],
    stretched: [u8; KEY_LEN],
    key_hash: [u8; KEY_LEN],
    seed_concat: Vec<u8>,
}

/// Derive the master key for `header` from `credentials`.
///
/// The caller must drop the returned key as soon as the cipher call
/// using it has completed.
pub fn derive_master_key(
    credentials: &dyn CompositeKey,
    header: &KdbxHeader,
    stretcher: &dyn KeyStretcher,
) -> Result<MasterKey> {
    let mut scratch = DerivationScratch::default();
    derive_into(&mut scratch, credentials, header, stretcher)
}

fn derive_into(
    scratch: &mut DerivationScratch,
    credentials: &dyn CompositeKey,
    header: &KdbxHeader,
    stretcher: &dyn KeyStretcher,
) -> Result<MasterKey> {
    credentials.composite_hash(&mut scratch.composite)?;

    let stretched = stretcher.stretch(
        &scratch.composite,
        &header.transform_seed,
        header.transform_rounds,
        &mut scratch.stretched,
    );
    scratch.composite.zeroize();
    stretched?;

    sha256_into(&scratch.stretched, &mut scratch.key_hash);
    scratch.stretched.zeroize();

    // Sized up front so the buffer never reallocates and leaves copies.
    scratch.seed_concat = Vec::with_capacity(header.master_seed.len() + KEY_LEN);
    scratch.seed_concat.extend_from_slice(&header.master_seed);
    scratch.seed_concat.extend_from_slice(&scratch.key_hash);
    scratch.key_hash.zeroize();

    let mut master = MasterKey::new([0u8; KEY_LEN]);
    sha256_into(&scratch.seed_concat, &mut master.bytes);
    scratch.seed_concat.as_mut_slice().zeroize();

    Ok(master)
}
