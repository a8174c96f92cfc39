//! Credentials: password and keyfile factors.
//!
//! Each factor is reduced to a 32-byte hash as soon as it is supplied,
//! and the composite key is `SHA-256(password_hash || keyfile_hash)`
//! over whichever factors are present.
//!
//! Keyfiles are accepted in the usual KeePass shapes:
//! - exactly 32 bytes: used as-is,
//! - exactly 64 hex characters: hex-decoded,
//! - an XML keyfile (`<KeyFile><Key><Data>base64</Data></Key></KeyFile>`),
//! - anything else: SHA-256 of the whole file.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::hash::{sha256_into, HASH_LEN};
use crate::errors::{KdbxError, Result};
use crate::xml;

/// Length of a generated keyfile in bytes (256 bits).
const KEYFILE_LEN: usize = 32;

/// Source of the composite key fed into master key derivation.
pub trait CompositeKey {
    /// Fails while the key cannot be used (e.g. no factor supplied).
    fn ready(&self) -> Result<()>;

    /// Write the composite hash into `out`.
    fn composite_hash(&self, out: &mut [u8; HASH_LEN]) -> Result<()>;
}

/// Password and/or keyfile credentials.  Factor hashes are zeroized
/// on drop.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    password_hash: Option<[u8; HASH_LEN]>,
    keyfile_hash: Option<[u8; HASH_LEN]>,
}

impl Credentials {
    /// Build credentials from an optional password and optional keyfile
    /// contents.
    pub fn new(password: Option<&[u8]>, keyfile: Option<&[u8]>) -> Result<Self> {
        let mut creds = Self::default();
        if let Some(pw) = password {
            creds.set_password(pw);
        }
        if let Some(kf) = keyfile {
            creds.set_keyfile(kf)?;
        }
        Ok(creds)
    }

    /// Password-only credentials.
    pub fn from_password(password: &[u8]) -> Self {
        let mut creds = Self::default();
        creds.set_password(password);
        creds
    }

    /// Replace the password factor.
    pub fn set_password(&mut self, password: &[u8]) {
        let mut hash = [0u8; HASH_LEN];
        sha256_into(password, &mut hash);
        self.password_hash.zeroize();
        self.password_hash = Some(hash);
        hash.zeroize();
    }

    /// Replace the keyfile factor with the given keyfile contents.
    pub fn set_keyfile(&mut self, contents: &[u8]) -> Result<()> {
        let hash = keyfile_hash(contents)?;
        self.keyfile_hash.zeroize();
        self.keyfile_hash = Some(*hash);
        Ok(())
    }

    /// Whether a keyfile factor is part of these credentials.
    pub fn has_keyfile(&self) -> bool {
        self.keyfile_hash.is_some()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("password", &self.password_hash.is_some())
            .field("keyfile", &self.keyfile_hash.is_some())
            .finish()
    }
}

impl CompositeKey for Credentials {
    fn ready(&self) -> Result<()> {
        if self.password_hash.is_none() && self.keyfile_hash.is_none() {
            return Err(KdbxError::InvalidCredentials(
                "no password or keyfile supplied".into(),
            ));
        }
        Ok(())
    }

    fn composite_hash(&self, out: &mut [u8; HASH_LEN]) -> Result<()> {
        self.ready()?;

        let mut all = Zeroizing::new(Vec::with_capacity(2 * HASH_LEN));
        if let Some(pw) = &self.password_hash {
            all.extend_from_slice(pw);
        }
        if let Some(kf) = &self.keyfile_hash {
            all.extend_from_slice(kf);
        }
        sha256_into(&all, out);
        Ok(())
    }
}

/// Reduce keyfile contents to the 32-byte keyfile factor.
fn keyfile_hash(contents: &[u8]) -> Result<Zeroizing<[u8; HASH_LEN]>> {
    if contents.is_empty() {
        return Err(KdbxError::KeyfileError("keyfile is empty".into()));
    }

    let mut out = Zeroizing::new([0u8; HASH_LEN]);

    if contents.len() == HASH_LEN {
        out.copy_from_slice(contents);
        return Ok(out);
    }

    if contents.len() == 2 * HASH_LEN {
        if let Ok(decoded) = hex::decode(contents) {
            let decoded = Zeroizing::new(decoded);
            out.copy_from_slice(&decoded);
            return Ok(out);
        }
    }

    if let Some(decoded) = xml_keyfile_data(contents)? {
        if decoded.len() != HASH_LEN {
            return Err(KdbxError::KeyfileError(format!(
                "XML keyfile key must be {HASH_LEN} bytes, got {}",
                decoded.len()
            )));
        }
        out.copy_from_slice(&decoded);
        return Ok(out);
    }

    sha256_into(contents, &mut out);
    Ok(out)
}

/// Extract `KeyFile/Key/Data` from an XML keyfile, if `contents` is one.
fn xml_keyfile_data(contents: &[u8]) -> Result<Option<Zeroizing<Vec<u8>>>> {
    let Ok(text) = std::str::from_utf8(contents) else {
        return Ok(None);
    };
    let Ok(doc) = xml::parse(text) else {
        return Ok(None);
    };
    if doc.root.name != "KeyFile" {
        return Ok(None);
    }

    let data = doc
        .root
        .child("Key")
        .and_then(|key| key.child("Data"))
        .map(|data| data.text())
        .ok_or_else(|| KdbxError::KeyfileError("XML keyfile has no Key/Data".into()))?;

    let decoded = BASE64
        .decode(data.trim())
        .map_err(|e| KdbxError::KeyfileError(format!("XML keyfile data is not base64: {e}")))?;
    Ok(Some(Zeroizing::new(decoded)))
}

/// Generate a new random keyfile and write it to `path`.
///
/// The file is written with restrictive permissions (owner-only read).
/// Returns the raw keyfile bytes so the caller can use them immediately.
pub fn generate_keyfile(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    if path.exists() {
        return Err(KdbxError::KeyfileError(format!(
            "keyfile already exists at {}",
            path.display()
        )));
    }

    let mut keyfile = Zeroizing::new(vec![0u8; KEYFILE_LEN]);
    rand::rng().fill_bytes(&mut keyfile);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                KdbxError::KeyfileError(format!("cannot create keyfile directory: {e}"))
            })?;
        }
    }

    fs::write(path, keyfile.as_slice())
        .map_err(|e| KdbxError::KeyfileError(format!("failed to write keyfile: {e}")))?;

    // On Unix, restrict permissions to owner-only read/write.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms).map_err(|e| {
            KdbxError::KeyfileError(format!("failed to set keyfile permissions: {e}"))
        })?;
    }

    Ok(keyfile)
}

/// Load keyfile contents from disk.
pub fn load_keyfile(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    if !path.exists() {
        return Err(KdbxError::KeyfileError(format!(
            "keyfile not found at {}",
            path.display()
        )));
    }

    let data = fs::read(path)
        .map_err(|e| KdbxError::KeyfileError(format!("failed to read keyfile: {e}")))?;

    Ok(Zeroizing::new(data))
}
