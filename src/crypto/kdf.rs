//! Key stretching using the AES-KDF transform.
//!
//! The 32-byte composite key is split into two 16-byte halves and each
//! half is encrypted with AES-256-ECB under the header's transform seed,
//! `rounds` times over.  The round count is stored in the header so it
//! can be tuned per database.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes256;

use crate::errors::{KdbxError, Result};

/// Length of the stretched key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Length of the transform seed in bytes (an AES-256 key).
pub const SEED_LEN: usize = 32;

/// Default number of transform rounds for newly created databases.
pub const DEFAULT_TRANSFORM_ROUNDS: u64 = 60_000;

/// Deliberately expensive transform applied to the composite key.
///
/// Implementations write the result into `out`; the caller owns and
/// wipes both buffers.
pub trait KeyStretcher {
    fn stretch(
        &self,
        key: &[u8; KEY_LEN],
        seed: &[u8],
        rounds: u64,
        out: &mut [u8; KEY_LEN],
    ) -> Result<()>;
}

/// AES-256-ECB key transform.
#[derive(Debug, Default, Clone, Copy)]
pub struct AesKdf;

impl KeyStretcher for AesKdf {
    fn stretch(
        &self,
        key: &[u8; KEY_LEN],
        seed: &[u8],
        rounds: u64,
        out: &mut [u8; KEY_LEN],
    ) -> Result<()> {
        if seed.len() != SEED_LEN {
            return Err(KdbxError::KeyDerivationFailed(format!(
                "transform seed must be {SEED_LEN} bytes, got {}",
                seed.len()
            )));
        }

        let cipher = Aes256::new_from_slice(seed)
            .map_err(|e| KdbxError::KeyDerivationFailed(format!("invalid transform seed: {e}")))?;

        out.copy_from_slice(key);
        let (left, right) = out.split_at_mut(KEY_LEN / 2);
        let left = GenericArray::from_mut_slice(left);
        let right = GenericArray::from_mut_slice(right);
        for _ in 0..rounds {
            cipher.encrypt_block(left);
            cipher.encrypt_block(right);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stretch(key: [u8; KEY_LEN], seed: &[u8], rounds: u64) -> Result<[u8; KEY_LEN]> {
        let mut out = [0u8; KEY_LEN];
        AesKdf.stretch(&key, seed, rounds, &mut out)?;
        Ok(out)
    }

    #[test]
    fn zero_rounds_is_identity() {
        let key = [0x5A; KEY_LEN];
        assert_eq!(stretch(key, &[1u8; SEED_LEN], 0).unwrap(), key);
    }

    #[test]
    fn same_inputs_same_output() {
        let a = stretch([1; KEY_LEN], &[2u8; SEED_LEN], 100).unwrap();
        let b = stretch([1; KEY_LEN], &[2u8; SEED_LEN], 100).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rounds_change_output() {
        let a = stretch([1; KEY_LEN], &[2u8; SEED_LEN], 1).unwrap();
        let b = stretch([1; KEY_LEN], &[2u8; SEED_LEN], 2).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn halves_are_transformed_independently() {
        // Identical halves must stay identical under ECB.
        let out = stretch([9; KEY_LEN], &[3u8; SEED_LEN], 10).unwrap();
        assert_eq!(out[..16], out[16..]);
    }

    #[test]
    fn rejects_short_seed() {
        let err = stretch([1; KEY_LEN], &[2u8; 16], 1).unwrap_err();
        assert!(matches!(err, KdbxError::KeyDerivationFailed(_)));
    }
}
