//! The in-memory database.
//!
//! A `Database` owns the credentials, the header it will be saved
//! behind, the metadata, and the document tree.  The tree is the source
//! of truth: entry accessors read and edit it directly, so elements the
//! crate does not model survive a load/save cycle untouched.
//!
//! Databases come out of `KdbxFormat::load`/`load_xml` fully populated,
//! or from `Database::create`/`from_document`.  A failed load never
//! produces one.

pub mod entry;
pub mod meta;
pub mod protected;

use std::fmt;

pub use entry::{Entry, FieldValue};
pub use meta::Meta;
pub use protected::ProtectedValue;

use entry::{element_title, new_uuid, ENTRY, GROUP};
use meta::KEEPASS_FILE;

use crate::crypto::CompositeKey;
use crate::errors::{KdbxError, Result};
use crate::format::KdbxHeader;
use crate::xml::{XmlDocument, XmlElement};

const ROOT: &str = "Root";

pub struct Database {
    credentials: Box<dyn CompositeKey>,
    header: KdbxHeader,
    meta: Meta,
    document: XmlDocument,
}

impl Database {
    /// A new empty database: a `KeePassFile` document holding one root
    /// group named after the database.
    pub fn create(credentials: impl CompositeKey + 'static, name: &str) -> Self {
        let mut group = XmlElement::new(GROUP);
        group.push(XmlElement::with_text("UUID", new_uuid()));
        group.push(XmlElement::with_text("Name", name));

        let mut root = XmlElement::new(ROOT);
        root.push(group);

        let mut keepass = XmlElement::new(KEEPASS_FILE);
        keepass.push(XmlElement::new("Meta"));
        keepass.push(root);

        let meta = Meta {
            generator: None,
            database_name: Some(name.to_owned()),
            header_hash: None,
        };
        let mut document = XmlDocument::new(keepass);
        meta.build_xml(&mut document);

        Self {
            credentials: Box::new(credentials),
            header: KdbxHeader::create(),
            meta,
            document,
        }
    }

    /// Wrap an existing document, reading its metadata.
    pub fn from_document(
        credentials: impl CompositeKey + 'static,
        header: KdbxHeader,
        document: XmlDocument,
    ) -> Result<Self> {
        let meta = Meta::load_from_xml(&document)?;
        Ok(Self::from_parts(Box::new(credentials), header, meta, document))
    }

    pub(crate) fn from_parts(
        credentials: Box<dyn CompositeKey>,
        header: KdbxHeader,
        meta: Meta,
        document: XmlDocument,
    ) -> Self {
        Self {
            credentials,
            header,
            meta,
            document,
        }
    }

    /// Install the state produced by a successful save.
    pub(crate) fn commit_save(&mut self, header: KdbxHeader, meta: Meta, document: XmlDocument) {
        self.header = header;
        self.meta = meta;
        self.document = document;
    }

    pub fn credentials(&self) -> &dyn CompositeKey {
        self.credentials.as_ref()
    }

    pub fn header(&self) -> &KdbxHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut KdbxHeader {
        &mut self.header
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn document(&self) -> &XmlDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut XmlDocument {
        &mut self.document
    }

    // -----------------------------------------------------------------------
    // Entries
    // -----------------------------------------------------------------------

    /// Every entry under `KeePassFile/Root`, depth first.
    pub fn entries(&self) -> Vec<Entry> {
        let mut out = Vec::new();
        if let Some(root) = self.root_element() {
            collect_entries(root, &mut out);
        }
        out
    }

    pub fn find_entry(&self, title: &str) -> Option<Entry> {
        self.entries().into_iter().find(|e| e.title() == title)
    }

    /// Update the entry with the same title in place, or add it to the
    /// first group.  An existing entry keeps its UUID and every child
    /// `Entry` does not model.
    pub fn upsert_entry(&mut self, entry: &Entry) -> Result<()> {
        let title = entry.title();
        let root = self
            .root_element_mut()
            .ok_or_else(|| KdbxError::Unsupported("document has no KeePassFile/Root".into()))?;

        if let Some(existing) = find_entry_element(root, &title) {
            entry.update_xml(existing);
            return Ok(());
        }
        root.child_or_insert(GROUP).push(entry.to_xml());
        Ok(())
    }

    pub fn remove_entry(&mut self, title: &str) -> Result<()> {
        let removed = self
            .root_element_mut()
            .is_some_and(|root| remove_entry_element(root, title));
        if removed {
            Ok(())
        } else {
            Err(KdbxError::EntryNotFound(title.to_owned()))
        }
    }

    fn root_element(&self) -> Option<&XmlElement> {
        if self.document.root.name != KEEPASS_FILE {
            return None;
        }
        self.document.root.child(ROOT)
    }

    fn root_element_mut(&mut self) -> Option<&mut XmlElement> {
        if self.document.root.name != KEEPASS_FILE {
            return None;
        }
        self.document.root.child_mut(ROOT)
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("header", &self.header)
            .field("meta", &self.meta)
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}

fn collect_entries(group: &XmlElement, out: &mut Vec<Entry>) {
    for child in group.elements() {
        match child.name.as_str() {
            ENTRY => out.push(Entry::from_xml(child)),
            GROUP => collect_entries(child, out),
            _ => {}
        }
    }
}

fn find_entry_element<'a>(group: &'a mut XmlElement, title: &str) -> Option<&'a mut XmlElement> {
    for child in group.elements_mut() {
        if child.name == ENTRY && element_title(child).as_deref() == Some(title) {
            return Some(child);
        }
        if child.name == GROUP {
            if let Some(found) = find_entry_element(child, title) {
                return Some(found);
            }
        }
    }
    None
}

fn remove_entry_element(group: &mut XmlElement, title: &str) -> bool {
    let pos = group.children.iter().position(|node| match node {
        crate::xml::XmlNode::Element(el) => {
            el.name == ENTRY && element_title(el).as_deref() == Some(title)
        }
        crate::xml::XmlNode::Text(_) => false,
    });
    if let Some(pos) = pos {
        group.children.remove(pos);
        return true;
    }
    group
        .elements_mut()
        .filter(|child| child.name == GROUP)
        .any(|child| remove_entry_element(child, title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Credentials;

    fn db() -> Database {
        Database::create(Credentials::from_password(b"pw"), "Test")
    }

    #[test]
    fn create_builds_skeleton() {
        let db = db();
        assert_eq!(db.document().root.name, KEEPASS_FILE);
        assert_eq!(db.meta().database_name.as_deref(), Some("Test"));
        assert!(db.entries().is_empty());
        let group = db.root_element().and_then(|r| r.child(GROUP)).unwrap();
        assert_eq!(group.child("Name").unwrap().text(), "Test");
    }

    #[test]
    fn upsert_find_remove() {
        let mut db = db();
        let mut entry = Entry::new("github");
        entry.set_field(entry::PASSWORD, "old");
        db.upsert_entry(&entry).unwrap();

        entry.set_field(entry::PASSWORD, "new");
        db.upsert_entry(&entry).unwrap();

        assert_eq!(db.entries().len(), 1);
        let found = db.find_entry("github").unwrap();
        assert_eq!(found.field(entry::PASSWORD).unwrap().reveal().as_str(), "new");

        db.remove_entry("github").unwrap();
        assert!(db.find_entry("github").is_none());
    }

    #[test]
    fn remove_missing_entry_fails() {
        let err = db().remove_entry("nope").unwrap_err();
        assert!(matches!(err, KdbxError::EntryNotFound(name) if name == "nope"));
    }

    #[test]
    fn nested_groups_are_searched() {
        let mut db = db();
        let mut sub = XmlElement::new(GROUP);
        sub.push(Entry::new("deep").to_xml());
        db.root_element_mut()
            .and_then(|r| r.child_mut(GROUP))
            .unwrap()
            .push(sub);

        assert!(db.find_entry("deep").is_some());
        db.remove_entry("deep").unwrap();
        assert!(db.entries().is_empty());
    }

    #[test]
    fn foreign_documents_have_no_entries() {
        let doc = crate::xml::parse("<Root/>").unwrap();
        let mut db =
            Database::from_document(Credentials::from_password(b"pw"), KdbxHeader::create(), doc)
                .unwrap();
        assert!(db.entries().is_empty());
        assert!(db.upsert_entry(&Entry::new("x")).is_err());
    }
}
