//! Database metadata stored under `KeePassFile/Meta`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::errors::{KdbxError, Result};
use crate::xml::{XmlDocument, XmlElement};

pub const KEEPASS_FILE: &str = "KeePassFile";
pub const GENERATOR: &str = "kdbx-cli";

const META: &str = "Meta";
const GENERATOR_TAG: &str = "Generator";
const DATABASE_NAME: &str = "DatabaseName";
const HEADER_HASH: &str = "HeaderHash";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    pub generator: Option<String>,
    pub database_name: Option<String>,
    /// SHA-256 of the header this document was saved behind.
    pub header_hash: Option<Vec<u8>>,
}

impl Meta {
    /// Read metadata from a document.  Documents without a
    /// `KeePassFile/Meta` element yield empty metadata.
    pub fn load_from_xml(doc: &XmlDocument) -> Result<Self> {
        let Some(meta) = meta_element(doc) else {
            return Ok(Self::default());
        };

        let header_hash = match meta.child(HEADER_HASH).map(XmlElement::text) {
            Some(text) if !text.trim().is_empty() => Some(
                BASE64
                    .decode(text.trim())
                    .map_err(|e| KdbxError::corrupt(format!("bad header hash: {e}")))?,
            ),
            _ => None,
        };

        Ok(Self {
            generator: meta.child(GENERATOR_TAG).map(XmlElement::text),
            database_name: meta.child(DATABASE_NAME).map(XmlElement::text),
            header_hash,
        })
    }

    /// Write metadata back into a `KeePassFile` document.  Other
    /// documents are left alone.
    pub fn build_xml(&self, doc: &mut XmlDocument) {
        if doc.root.name != KEEPASS_FILE {
            return;
        }

        let meta = doc.root.child_or_insert(META);
        meta.child_or_insert(GENERATOR_TAG).set_text(GENERATOR);
        if let Some(name) = &self.database_name {
            meta.child_or_insert(DATABASE_NAME).set_text(name.as_str());
        }
        if let Some(hash) = &self.header_hash {
            meta.child_or_insert(HEADER_HASH).set_text(BASE64.encode(hash));
        }
    }
}

fn meta_element(doc: &XmlDocument) -> Option<&XmlElement> {
    if doc.root.name != KEEPASS_FILE {
        return None;
    }
    doc.root.child(META)
}
