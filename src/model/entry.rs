//! Password entries as stored in the document tree.
//!
//! ```text
//! <Entry>
//!     <UUID>base64</UUID>
//!     <String><Key>Title</Key><Value>...</Value></String>
//!     <String><Key>Password</Key><Value Protected="True">...</Value></String>
//! </Entry>
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use zeroize::Zeroizing;

use super::ProtectedValue;
use crate::xml::protect::PROTECTED_ATTR;
use crate::xml::{XmlElement, XmlNode};

pub const ENTRY: &str = "Entry";
pub const GROUP: &str = "Group";

const UUID: &str = "UUID";
const STRING: &str = "String";
const KEY: &str = "Key";
const VALUE: &str = "Value";

pub const TITLE: &str = "Title";
pub const USERNAME: &str = "UserName";
pub const PASSWORD: &str = "Password";
pub const URL: &str = "URL";
pub const NOTES: &str = "Notes";

/// Random 16-byte identifier, base64 encoded.
pub fn new_uuid() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    BASE64.encode(bytes)
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Plain(String),
    Protected(ProtectedValue),
}

impl FieldValue {
    /// The clear value.
    pub fn reveal(&self) -> Zeroizing<String> {
        match self {
            FieldValue::Plain(s) => Zeroizing::new(s.clone()),
            FieldValue::Protected(pv) => Zeroizing::new(pv.text()),
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, FieldValue::Protected(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub uuid: String,
    /// Fields in document order.
    pub fields: Vec<(String, FieldValue)>,
}

impl Entry {
    pub fn new(title: &str) -> Self {
        let mut entry = Self {
            uuid: new_uuid(),
            fields: Vec::new(),
        };
        entry.set_field(TITLE, title);
        entry
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn title(&self) -> String {
        self.field(TITLE)
            .map(|v| v.reveal().to_string())
            .unwrap_or_default()
    }

    /// Set a field; `Password` is always stored protected.
    pub fn set_field(&mut self, key: &str, value: &str) {
        let value = if key == PASSWORD {
            FieldValue::Protected(ProtectedValue::from_text(value))
        } else {
            FieldValue::Plain(value.to_owned())
        };
        match self.fields.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.fields.push((key.to_owned(), value)),
        }
    }

    pub(crate) fn from_xml(el: &XmlElement) -> Self {
        let uuid = el.child(UUID).map(XmlElement::text).unwrap_or_default();
        let fields = el
            .elements()
            .filter(|child| child.name == STRING)
            .filter_map(|string| {
                let key = string.child(KEY)?.text();
                let value = match string.child(VALUE) {
                    Some(v) if v.attribute(PROTECTED_ATTR).is_some() => FieldValue::Protected(
                        v.protected_value
                            .clone()
                            .unwrap_or_else(|| ProtectedValue::from_text("")),
                    ),
                    Some(v) => FieldValue::Plain(v.text()),
                    None => FieldValue::Plain(String::new()),
                };
                Some((key, value))
            })
            .collect();
        Self { uuid, fields }
    }

    pub(crate) fn to_xml(&self) -> XmlElement {
        let mut el = XmlElement::new(ENTRY);
        el.push(XmlElement::with_text(UUID, self.uuid.as_str()));
        for (key, value) in &self.fields {
            el.push(string_element(key, value));
        }
        el
    }

    /// Write the fields into an existing `Entry` element in place.
    ///
    /// Matching `String` children get a new `Value`; missing ones are
    /// inserted after the last `String`.  Everything else (UUID, `Times`,
    /// `History`, attributes) is left as it was.
    pub(crate) fn update_xml(&self, el: &mut XmlElement) {
        for (key, value) in &self.fields {
            let pos = el.children.iter().position(|node| match node {
                XmlNode::Element(string) => is_field(string, key),
                XmlNode::Text(_) => false,
            });
            match pos {
                Some(idx) => {
                    if let XmlNode::Element(string) = &mut el.children[idx] {
                        write_value(string.child_or_insert(VALUE), value);
                    }
                }
                None => {
                    let at = el
                        .children
                        .iter()
                        .rposition(|node| matches!(node, XmlNode::Element(s) if s.name == STRING))
                        .map_or(el.children.len(), |idx| idx + 1);
                    el.children
                        .insert(at, XmlNode::Element(string_element(key, value)));
                }
            }
        }
    }
}

fn is_field(string: &XmlElement, key: &str) -> bool {
    string.name == STRING && string.child(KEY).is_some_and(|k| k.text() == key)
}

fn string_element(key: &str, value: &FieldValue) -> XmlElement {
    let mut string = XmlElement::new(STRING);
    string.push(XmlElement::with_text(KEY, key));
    let mut value_el = XmlElement::new(VALUE);
    write_value(&mut value_el, value);
    string.push(value_el);
    string
}

fn write_value(el: &mut XmlElement, value: &FieldValue) {
    match value {
        FieldValue::Plain(text) => {
            el.remove_attribute(PROTECTED_ATTR);
            el.protected_value = None;
            el.set_text(text.as_str());
        }
        FieldValue::Protected(pv) => {
            el.set_attribute(PROTECTED_ATTR, "True");
            el.set_text(pv.to_base64());
            el.protected_value = (!pv.is_empty()).then(|| pv.clone());
        }
    }
}

/// Title of an `Entry` element without building the whole entry.
pub(crate) fn element_title(el: &XmlElement) -> Option<String> {
    el.elements()
        .filter(|child| child.name == STRING)
        .find(|string| string.child(KEY).is_some_and(|k| k.text() == TITLE))
        .and_then(|string| string.child(VALUE))
        .map(|v| match &v.protected_value {
            Some(pv) => pv.text(),
            None => v.text(),
        })
}
