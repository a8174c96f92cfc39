//! Owned XML document tree for the decrypted body.
//!
//! The tree keeps element order, attributes in document order, and text
//! content.  Whitespace-only text inside elements that also contain
//! child elements is layout and is dropped on parse, so a tree survives
//! `serialize` → `parse` unchanged.
//!
//! Elements may carry a `ProtectedValue` attached by the protection
//! passes in `protect`; serialization only ever writes the element's
//! text, never the protected value itself.

pub mod protect;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::errors::{KdbxError, Result};
use crate::model::ProtectedValue;

/// A parsed document: one root element.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub root: XmlElement,
}

impl XmlDocument {
    pub fn new(root: XmlElement) -> Self {
        Self { root }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    pub protected_value: Option<ProtectedValue>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Element containing a single text node.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut el = Self::new(name);
        el.set_text(text);
        el
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing one in place.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_owned(),
            None => self.attributes.push((name.to_owned(), value.to_owned())),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) {
        self.attributes.retain(|(k, _)| k != name);
    }

    /// Child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    /// First child element called `name`.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|el| el.name == name)
    }

    /// First child element called `name`, appended if missing.
    pub fn child_or_insert(&mut self, name: &str) -> &mut XmlElement {
        let pos = self
            .children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(el) if el.name == name));
        let idx = match pos {
            Some(idx) => idx,
            None => {
                self.children.push(XmlNode::Element(XmlElement::new(name)));
                self.children.len() - 1
            }
        };
        match &mut self.children[idx] {
            XmlNode::Element(el) => el,
            XmlNode::Text(_) => unreachable!("index points at an element"),
        }
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Concatenated text of the direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// Replace all children with a single text node (none if empty).
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.children.clear();
        if !text.is_empty() {
            self.children.push(XmlNode::Text(text));
        }
    }

    fn push_text(&mut self, text: String) {
        if let Some(XmlNode::Text(last)) = self.children.last_mut() {
            last.push_str(&text);
        } else {
            self.children.push(XmlNode::Text(text));
        }
    }

    fn drop_layout_whitespace(&mut self) {
        let has_elements = self
            .children
            .iter()
            .any(|node| matches!(node, XmlNode::Element(_)));
        if has_elements {
            self.children.retain(|node| match node {
                XmlNode::Text(t) => !t.trim().is_empty(),
                XmlNode::Element(_) => true,
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn bad_xml(e: impl std::fmt::Display) -> KdbxError {
    KdbxError::corrupt(format!("bad xml: {e}"))
}

/// Parse document text into a tree.
pub fn parse(text: &str) -> Result<XmlDocument> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event().map_err(bad_xml)? {
            Event::Start(start) => stack.push(element_from(&start)?),
            Event::Empty(start) => attach(&mut stack, &mut root, element_from(&start)?)?,
            Event::End(_) => {
                let mut el = stack.pop().ok_or_else(|| bad_xml("unbalanced end tag"))?;
                el.drop_layout_whitespace();
                attach(&mut stack, &mut root, el)?;
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(bad_xml)?.into_owned();
                attach_text(&mut stack, text)?;
            }
            Event::CData(c) => {
                let text = String::from_utf8(c.into_inner().into_owned()).map_err(bad_xml)?;
                attach_text(&mut stack, text)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctype.
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(bad_xml(format!("unclosed element <{}>", open.name)));
    }
    root.map(XmlDocument::new)
        .ok_or_else(|| bad_xml("no root element"))
}

fn element_from(start: &BytesStart<'_>) -> Result<XmlElement> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(bad_xml)?
        .to_owned();
    let mut el = XmlElement::new(name);

    for attr in start.attributes() {
        let attr = attr.map_err(bad_xml)?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(bad_xml)?
            .to_owned();
        let value = attr.unescape_value().map_err(bad_xml)?.into_owned();
        el.attributes.push((key, value));
    }

    Ok(el)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, el: XmlElement) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.push(el),
        None if root.is_none() => *root = Some(el),
        None => return Err(bad_xml("multiple root elements")),
    }
    Ok(())
}

fn attach_text(stack: &mut [XmlElement], text: String) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.push_text(text),
        None if text.trim().is_empty() => {}
        None => return Err(bad_xml("text outside the root element")),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

fn write_failed(e: impl std::fmt::Display) -> KdbxError {
    KdbxError::SerializationError(format!("xml: {e}"))
}

/// Serialize the tree with an XML declaration and tab indentation.
pub fn serialize(doc: &XmlDocument) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), Some("yes"))))
        .map_err(write_failed)?;
    write_element(&mut writer, &doc.root)?;
    String::from_utf8(writer.into_inner()).map_err(write_failed)
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(el.name.as_str());
    for (k, v) in &el.attributes {
        start.push_attribute((k.as_str(), v.as_str()));
    }

    if el.children.is_empty() {
        writer.write_event(Event::Empty(start)).map_err(write_failed)?;
        return Ok(());
    }

    writer.write_event(Event::Start(start)).map_err(write_failed)?;
    for child in &el.children {
        match child {
            XmlNode::Element(child) => write_element(writer, child)?,
            XmlNode::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(write_failed)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(el.name.as_str())))
        .map_err(write_failed)?;
    Ok(())
}
