//! AES-256-CBC body encryption.
//!
//! The database body is encrypted as a whole with PKCS#7 padding, keyed
//! by the master key and the IV stored in the header:
//!
//! ```text
//! ciphertext = AES-256-CBC(master_key, header.encryption_iv, body)
//! ```
//!
//! CBC carries no authentication tag, so a wrong key usually shows up
//! as a padding failure and otherwise as a start-marker mismatch.

use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use super::keys::MasterKey;
use crate::errors::{KdbxError, Result};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES block size in bytes.
pub const AES_BLOCK_LEN: usize = 16;

/// Symmetric cipher used for the database body.
///
/// Injected into `KdbxFormat` so tests can substitute it.
pub trait BodyCipher {
    /// Encrypt `plaintext` under `key` and `iv`.
    fn encrypt(&self, key: &MasterKey, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt `ciphertext` under `key` and `iv`.
    fn decrypt(&self, key: &MasterKey, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// AES-256-CBC with PKCS#7 padding.
#[derive(Debug, Default, Clone, Copy)]
pub struct AesCbc;

impl BodyCipher for AesCbc {
    fn encrypt(&self, key: &MasterKey, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = Aes256CbcEnc::new_from_slices(key.as_bytes(), iv)
            .map_err(|e| KdbxError::EncryptionFailed(format!("invalid key or IV length: {e}")))?;
        Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    fn decrypt(&self, key: &MasterKey, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        // A truncated body can never decrypt, whatever the key.
        if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK_LEN != 0 {
            return Err(KdbxError::corrupt(format!(
                "ciphertext length {} is not a multiple of {AES_BLOCK_LEN}",
                ciphertext.len()
            )));
        }

        let cipher = Aes256CbcDec::new_from_slices(key.as_bytes(), iv)
            .map_err(|e| KdbxError::corrupt(format!("invalid encryption IV: {e}")))?;

        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| KdbxError::InvalidKey)
    }
}
