//! Protection passes over the document tree.
//!
//! Inside an encrypted body, protected values are stored as base64 of
//! `value XOR keystream` and flagged `Protected="True"`.  In plain XML
//! exports they are stored as clear text flagged `ProtectInMemory="True"`.
//! These passes move elements between the two forms and attach the
//! in-memory `ProtectedValue`.
//!
//! Keystream salts are consumed in document order; every pass that takes
//! a generator must visit protected elements in the same order.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::XmlElement;
use crate::crypto::ProtectSaltGenerator;
use crate::errors::{KdbxError, Result};
use crate::model::ProtectedValue;

pub const PROTECTED_ATTR: &str = "Protected";
pub const PROTECT_IN_MEMORY_ATTR: &str = "ProtectInMemory";
const TRUE: &str = "True";

fn flag_set(el: &XmlElement, attr: &str) -> bool {
    el.attribute(attr)
        .is_some_and(|v| v.eq_ignore_ascii_case(TRUE))
}

/// Load: decode every `Protected` element and attach its value, salted
/// with the next bytes of `gen`.
pub fn set_protected_values(el: &mut XmlElement, gen: &mut ProtectSaltGenerator) -> Result<()> {
    if flag_set(el, PROTECTED_ATTR) {
        let value = BASE64
            .decode(el.text().trim())
            .map_err(|e| KdbxError::corrupt(format!("bad protected value in <{}>: {e}", el.name)))?;
        if !value.is_empty() {
            let salt = gen.salt(value.len());
            el.protected_value = Some(ProtectedValue::new(value, salt));
        }
        return Ok(());
    }

    for child in el.elements_mut() {
        set_protected_values(child, gen)?;
    }
    Ok(())
}

/// Save: re-salt every protected value with the next bytes of `gen` and
/// rewrite its text.
pub fn update_protected_values_salt(el: &mut XmlElement, gen: &mut ProtectSaltGenerator) {
    if flag_set(el, PROTECTED_ATTR) {
        if let Some(pv) = el.protected_value.as_mut() {
            let salt = gen.salt(pv.len());
            pv.set_salt(salt);
            let encoded = pv.to_base64();
            el.set_text(encoded);
        }
        return;
    }

    for child in el.elements_mut() {
        update_protected_values_salt(child, gen);
    }
}

/// Plain XML load: turn `ProtectInMemory` clear text into protected
/// values with random salts.  Empty values get no `ProtectedValue`,
/// as on a binary load.
pub fn protect_plain_values(el: &mut XmlElement) {
    if flag_set(el, PROTECT_IN_MEMORY_ATTR) {
        let pv = ProtectedValue::from_text(&el.text());
        el.set_text(pv.to_base64());
        el.protected_value = (!pv.is_empty()).then_some(pv);
        el.remove_attribute(PROTECT_IN_MEMORY_ATTR);
        el.set_attribute(PROTECTED_ATTR, TRUE);
        return;
    }

    for child in el.elements_mut() {
        protect_plain_values(child);
    }
}

/// Plain XML save: write protected values as clear text.
pub fn unprotect_values(el: &mut XmlElement) {
    if flag_set(el, PROTECTED_ATTR) {
        if let Some(text) = el.protected_value.as_ref().map(ProtectedValue::text) {
            el.remove_attribute(PROTECTED_ATTR);
            el.set_attribute(PROTECT_IN_MEMORY_ATTR, TRUE);
            el.set_text(text);
        }
        return;
    }

    for child in el.elements_mut() {
        unprotect_values(child);
    }
}

/// Undo `unprotect_values` after the plain text has been serialized.
pub fn protect_unprotected_values(el: &mut XmlElement) {
    if flag_set(el, PROTECT_IN_MEMORY_ATTR) {
        if let Some(encoded) = el.protected_value.as_ref().map(ProtectedValue::to_base64) {
            el.remove_attribute(PROTECT_IN_MEMORY_ATTR);
            el.set_attribute(PROTECTED_ATTR, TRUE);
            el.set_text(encoded);
        }
        return;
    }

    for child in el.elements_mut() {
        protect_unprotected_values(child);
    }
}
