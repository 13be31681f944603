//! Shared XML attribute utilities for the parsing and patching passes.
//!
//! All functions handle UTF-8 conversion safely and never panic on
//! malformed attributes.

use quick_xml::events::BytesStart;

/// Extract a string attribute value by key.
///
/// Returns `None` if the attribute is missing or not valid UTF-8.
#[must_use]
pub fn attr_string(e: &BytesStart, key: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return std::str::from_utf8(&attr.value).ok().map(|s| s.to_string());
        }
    }
    None
}

/// Extract a `u32` attribute value by key.
#[must_use]
pub fn attr_u32(e: &BytesStart, key: &[u8]) -> Option<u32> {
    attr_string(e, key).and_then(|s| s.parse().ok())
}

/// Copy of `e` with one attribute replaced (or appended when absent).
///
/// All other attributes ride through in their original order, so the
/// re-serialized element differs from the input only in the target
/// attribute's value.
#[must_use]
pub fn replace_attr(e: &BytesStart, key: &str, value: &str) -> BytesStart<'static> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);
    let mut replaced = false;

    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key.as_bytes() {
            out.push_attribute((key, value));
            replaced = true;
        } else {
            out.push_attribute(attr);
        }
    }
    if !replaced {
        out.push_attribute((key, value));
    }

    out
}
