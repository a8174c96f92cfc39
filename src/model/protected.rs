//! In-memory protected field values.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// A field value kept XOR-masked while it sits in the document tree.
///
/// `value` holds `plaintext XOR salt`; the plaintext only exists in
/// short-lived `Zeroizing` buffers handed out by `binary` and `text`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ProtectedValue {
    value: Vec<u8>,
    salt: Vec<u8>,
}

impl ProtectedValue {
    /// Wrap already-masked bytes with the salt that unmasks them.
    pub fn new(value: Vec<u8>, salt: Vec<u8>) -> Self {
        Self { value, salt }
    }

    /// Mask `bytes` under a fresh random salt.
    pub fn from_binary(bytes: &[u8]) -> Self {
        let mut salt = vec![0u8; bytes.len()];
        rand::rng().fill_bytes(&mut salt);
        let value = xor(bytes, &salt);
        Self { value, salt }
    }

    pub fn from_text(text: &str) -> Self {
        Self::from_binary(text.as_bytes())
    }

    /// Unmasked bytes.
    pub fn binary(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(xor(&self.value, &self.salt))
    }

    /// Unmasked value as text (invalid UTF-8 is replaced).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.binary()).into_owned()
    }

    /// Re-mask the value under `new_salt`, which must have the same length.
    pub fn set_salt(&mut self, new_salt: Vec<u8>) {
        let plain = self.binary();
        self.value.zeroize();
        self.value = xor(&plain, &new_salt);
        self.salt.zeroize();
        self.salt = new_salt;
    }

    /// Base64 of the masked bytes, as stored in an encrypted body.
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.value)
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

fn xor(data: &[u8], salt: &[u8]) -> Vec<u8> {
    data.iter().zip(salt).map(|(a, b)| a ^ b).collect()
}

/// Equal when the unmasked values are equal, whatever the salts.
impl PartialEq for ProtectedValue {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && bool::from(self.binary().ct_eq(&other.binary()))
    }
}

impl fmt::Debug for ProtectedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProtectedValue(<{} bytes>)", self.len())
    }
}
