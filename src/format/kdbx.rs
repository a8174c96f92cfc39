//! Load and save pipelines for KDBX 3.1 files.
//!
//! ```text
//! [ header, 0..end_pos ]
//! [ AES-CBC(master_key, iv,
//!     [ start marker ]
//!     [ hashed blocks of [ optionally gzipped XML ] ]) ]
//! ```
//!
//! Each pipeline is a straight sequence of fallible steps.  Plaintext
//! buffers are held in `Zeroizing` and the master key is dropped as soon
//! as the cipher call that needs it returns.  Load builds the `Database`
//! only after every check has passed; save works on copies of the
//! header, metadata and document and commits them only once the
//! ciphertext exists.

use rand::RngCore;
use tracing::debug;
use zeroize::Zeroizing;

use super::checks::{header_hash, strip_start_marker, verify_header_hash};
use super::gzip;
use super::header::{Compression, KdbxHeader};
use super::stream::BinaryStream;
use crate::crypto::{
    derive_master_key, hashed_block, AesCbc, AesKdf, BodyCipher, CompositeKey, KeyStretcher,
    MasterKey, ProtectSaltGenerator,
};
use crate::errors::{KdbxError, Result};
use crate::model::{Database, Meta};
use crate::xml::{self, protect};

/// Upper bound on transform rounds accepted by default.
pub const DEFAULT_MAX_TRANSFORM_ROUNDS: u64 = 100_000_000;

pub struct KdbxFormat {
    cipher: Box<dyn BodyCipher>,
    stretcher: Box<dyn KeyStretcher>,
    max_transform_rounds: u64,
}

impl Default for KdbxFormat {
    fn default() -> Self {
        Self::new(AesCbc, AesKdf)
    }
}

impl KdbxFormat {
    pub fn new(cipher: impl BodyCipher + 'static, stretcher: impl KeyStretcher + 'static) -> Self {
        Self {
            cipher: Box::new(cipher),
            stretcher: Box::new(stretcher),
            max_transform_rounds: DEFAULT_MAX_TRANSFORM_ROUNDS,
        }
    }

    /// Refuse headers asking for more than `max` transform rounds.
    pub fn with_max_transform_rounds(mut self, max: u64) -> Self {
        self.max_transform_rounds = max;
        self
    }

    pub fn max_transform_rounds(&self) -> u64 {
        self.max_transform_rounds
    }

    // -----------------------------------------------------------------------
    // Binary
    // -----------------------------------------------------------------------

    /// Decrypt and parse a database file.
    ///
    /// Fails with `InvalidKey` when the credentials do not open the file
    /// and with `FileCorrupt` when any integrity check fails.
    pub fn load(&self, credentials: impl CompositeKey + 'static, data: &[u8]) -> Result<Database> {
        credentials.ready()?;

        let mut stm = BinaryStream::from_bytes(data);
        let header = KdbxHeader::read(&mut stm)?;
        let ciphertext = stm.read_bytes_to_end();

        let plaintext = self.decrypt_body(&credentials, &header, ciphertext)?;
        debug!(len = plaintext.len(), "body decrypted");

        let framed = strip_start_marker(&plaintext, &header.stream_start_bytes)?;
        let payload = Zeroizing::new(hashed_block::decode(framed)?);
        debug!(len = payload.len(), "blocks verified");

        let xml_bytes = match header.compression {
            Compression::GZip => Zeroizing::new(gzip::decompress(&payload)?),
            Compression::None => payload,
        };
        let text = std::str::from_utf8(&xml_bytes)
            .map_err(|e| KdbxError::corrupt(format!("document is not UTF-8: {e}")))?;

        let mut document = xml::parse(text)?;
        let mut gen = ProtectSaltGenerator::new(&header.protected_stream_key);
        protect::set_protected_values(&mut document.root, &mut gen)?;

        let meta = Meta::load_from_xml(&document)?;
        if let Some(recorded) = &meta.header_hash {
            let header_bytes = stm.read_bytes_no_advance(0, header.end_pos)?;
            verify_header_hash(recorded, header_bytes)?;
            debug!("header hash verified");
        }

        Ok(Database::from_parts(
            Box::new(credentials),
            header,
            meta,
            document,
        ))
    }

    /// Encrypt `db` with fresh salts from the thread RNG.
    pub fn save(&self, db: &mut Database) -> Result<Vec<u8>> {
        self.save_with_rng(db, &mut rand::rng())
    }

    /// Encrypt `db`, drawing every salt, seed, and IV from `rng`.
    pub fn save_with_rng<R: RngCore + ?Sized>(&self, db: &mut Database, rng: &mut R) -> Result<Vec<u8>> {
        db.credentials().ready()?;

        let mut header = db.header().clone();
        header.generate_salts(rng);

        let mut stm = BinaryStream::new();
        header.write(&mut stm)?;

        let mut meta = db.meta().clone();
        meta.header_hash = Some(header_hash(stm.written_bytes()).to_vec());

        let mut document = db.document().clone();
        meta.build_xml(&mut document);
        let mut gen = ProtectSaltGenerator::new(&header.protected_stream_key);
        protect::update_protected_values_salt(&mut document.root, &mut gen);

        let text = Zeroizing::new(xml::serialize(&document)?);
        let payload = match header.compression {
            Compression::GZip => Zeroizing::new(gzip::compress(text.as_bytes())?),
            Compression::None => Zeroizing::new(text.as_bytes().to_vec()),
        };
        let framed = Zeroizing::new(hashed_block::encode(&payload));

        let mut plaintext = Zeroizing::new(Vec::with_capacity(
            header.stream_start_bytes.len() + framed.len(),
        ));
        plaintext.extend_from_slice(&header.stream_start_bytes);
        plaintext.extend_from_slice(&framed);

        let ciphertext = self.encrypt_body(db.credentials(), &header, &plaintext)?;
        stm.write_bytes(&ciphertext);
        debug!(
            header_len = header.end_pos,
            body_len = ciphertext.len(),
            "database encrypted"
        );

        db.commit_save(header, meta, document);
        Ok(stm.into_bytes())
    }

    // -----------------------------------------------------------------------
    // Plain XML
    // -----------------------------------------------------------------------

    /// Build a database from plain XML.  Values flagged
    /// `ProtectInMemory` become protected values.
    pub fn load_xml(&self, credentials: impl CompositeKey + 'static, text: &str) -> Result<Database> {
        credentials.ready()?;

        let mut document = xml::parse(text)?;
        protect::protect_plain_values(&mut document.root);
        let meta = Meta::load_from_xml(&document)?;

        Ok(Database::from_parts(
            Box::new(credentials),
            KdbxHeader::create(),
            meta,
            document,
        ))
    }

    /// Serialize `db` as plain XML with protected values in the clear.
    /// The database itself keeps them protected.
    pub fn save_xml(&self, db: &mut Database) -> Result<String> {
        db.credentials().ready()?;

        let mut document = db.document().clone();
        db.meta().build_xml(&mut document);

        protect::unprotect_values(&mut document.root);
        let text = xml::serialize(&document);
        protect::protect_unprotected_values(&mut document.root);

        let text = text?;
        *db.document_mut() = document;
        Ok(text)
    }

    // -----------------------------------------------------------------------
    // Body cipher
    // -----------------------------------------------------------------------

    fn master_key(&self, credentials: &dyn CompositeKey, header: &KdbxHeader) -> Result<MasterKey> {
        if header.transform_rounds > self.max_transform_rounds {
            return Err(KdbxError::KeyDerivationFailed(format!(
                "{} transform rounds exceeds the limit of {}",
                header.transform_rounds, self.max_transform_rounds
            )));
        }
        derive_master_key(credentials, header, self.stretcher.as_ref())
    }

    fn decrypt_body(
        &self,
        credentials: &dyn CompositeKey,
        header: &KdbxHeader,
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        let key = self.master_key(credentials, header)?;
        let plaintext = self.cipher.decrypt(&key, &header.encryption_iv, ciphertext);
        drop(key);
        plaintext.map(Zeroizing::new)
    }

    fn encrypt_body(
        &self,
        credentials: &dyn CompositeKey,
        header: &KdbxHeader,
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        let key = self.master_key(credentials, header)?;
        let ciphertext = self.cipher.encrypt(&key, &header.encryption_iv, plaintext);
        drop(key);
        ciphertext
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Credentials;
    use crate::model::Entry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fast() -> KdbxFormat {
        KdbxFormat::default()
    }

    fn new_db(password: &[u8]) -> Database {
        let mut db = Database::create(Credentials::from_password(password), "Unit");
        db.header_mut().transform_rounds = 10;
        db
    }

    #[test]
    fn save_then_load() {
        let mut db = new_db(b"pw");
        let mut entry = Entry::new("site");
        entry.set_field("Password", "s3cret");
        db.upsert_entry(&entry).unwrap();

        let bytes = fast().save(&mut db).unwrap();
        let loaded = fast().load(Credentials::from_password(b"pw"), &bytes).unwrap();

        assert_eq!(loaded.document(), db.document());
        let found = loaded.find_entry("site").unwrap();
        assert_eq!(found.field("Password").unwrap().reveal().as_str(), "s3cret");
    }

    #[test]
    fn save_records_header_hash() {
        let mut db = new_db(b"pw");
        let bytes = fast().save(&mut db).unwrap();

        let recorded = db.meta().header_hash.clone().unwrap();
        assert_eq!(recorded, header_hash(&bytes[..db.header().end_pos]).to_vec());
    }

    #[test]
    fn each_save_uses_fresh_salts() {
        let mut db = new_db(b"pw");
        let first = fast().save(&mut db).unwrap();
        let seed_before = db.header().master_seed.clone();
        let second = fast().save(&mut db).unwrap();
        assert_ne!(first, second);
        assert_ne!(seed_before, db.header().master_seed);
    }

    #[test]
    fn seeded_rng_is_deterministic() {
        let mut a = new_db(b"pw");
        let mut b = Database::from_document(
            Credentials::from_password(b"pw"),
            a.header().clone(),
            a.document().clone(),
        )
        .unwrap();
        let out_a = fast().save_with_rng(&mut a, &mut StdRng::seed_from_u64(7)).unwrap();
        let out_b = fast().save_with_rng(&mut b, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn wrong_password_is_rejected() {
        let mut db = new_db(b"right");
        let bytes = fast().save(&mut db).unwrap();
        let err = fast()
            .load(Credentials::from_password(b"wrong"), &bytes)
            .unwrap_err();
        assert!(matches!(err, KdbxError::InvalidKey | KdbxError::FileCorrupt(_)));
    }

    #[test]
    fn rounds_above_limit_are_refused() {
        let mut db = new_db(b"pw");
        db.header_mut().transform_rounds = 11;
        let err = fast().with_max_transform_rounds(10).save(&mut db).unwrap_err();
        assert!(matches!(err, KdbxError::KeyDerivationFailed(_)));
    }

    #[test]
    fn failed_save_leaves_database_untouched() {
        let mut db = new_db(b"pw");
        db.header_mut().transform_rounds = 11;
        let before = db.header().clone();
        assert!(fast().with_max_transform_rounds(10).save(&mut db).is_err());
        assert_eq!(db.header(), &before);
        assert!(db.meta().header_hash.is_none());
    }

    #[test]
    fn empty_credentials_are_not_ready() {
        let mut db = Database::create(Credentials::default(), "Unit");
        let err = fast().save(&mut db).unwrap_err();
        assert!(matches!(err, KdbxError::InvalidCredentials(_)));
    }

    #[test]
    fn xml_roundtrip_keeps_values_protected() {
        let mut db = new_db(b"pw");
        let mut entry = Entry::new("site");
        entry.set_field("Password", "plain-in-xml");
        db.upsert_entry(&entry).unwrap();
        let tree_before = db.document().clone();

        let text = fast().save_xml(&mut db).unwrap();
        assert!(text.contains("ProtectInMemory=\"True\""));
        assert!(text.contains("plain-in-xml"));
        assert_eq!(
            db.find_entry("site").unwrap().field("Password"),
            entry.field("Password")
        );
        assert_eq!(db.document().root.name, tree_before.root.name);

        let reloaded = fast()
            .load_xml(Credentials::from_password(b"pw"), &text)
            .unwrap();
        let found = reloaded.find_entry("site").unwrap();
        assert!(found.field("Password").unwrap().is_protected());
        assert_eq!(found.field("Password").unwrap().reveal().as_str(), "plain-in-xml");
    }
}
