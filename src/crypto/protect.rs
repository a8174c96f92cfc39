//! Inner keystream for protected field values.
//!
//! Protected values (passwords and other fields flagged `Protected`) are
//! XORed with a Salsa20 keystream inside the document, independent of
//! the outer body encryption.  The stream is keyed with
//! `SHA-256(protected_stream_key)` and a fixed nonce, and salts are
//! handed out in document order, so load and save must walk the tree
//! identically.

use salsa20::cipher::{KeyIvInit, StreamCipher};
use salsa20::Salsa20;
use zeroize::Zeroizing;

use super::hash::{sha256_into, HASH_LEN};

/// Fixed Salsa20 nonce for the inner random stream.
const SALSA20_NONCE: [u8; 8] = [0xE8, 0x30, 0x09, 0x4B, 0x97, 0x20, 0x5D, 0x2A];

/// Generator of per-value salts.  One instance per load or save.
pub struct ProtectSaltGenerator {
    cipher: Salsa20,
}

impl ProtectSaltGenerator {
    /// Key a fresh keystream from the header's protected stream key.
    pub fn new(protected_stream_key: &[u8]) -> Self {
        let mut key = Zeroizing::new([0u8; HASH_LEN]);
        sha256_into(protected_stream_key, &mut key);
        let cipher = Salsa20::new(
            salsa20::Key::from_slice(key.as_slice()),
            salsa20::Nonce::from_slice(&SALSA20_NONCE),
        );
        Self { cipher }
    }

    /// Next `len` bytes of keystream.
    pub fn salt(&mut self, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.cipher.apply_keystream(&mut buf);
        buf
    }
}
