//! Shape-tolerant text extraction.
//!
//! Every supported value shape implements [`AsText`] once; record-like types
//! implement [`FieldText`] on top of it. Nothing here branches on the concrete
//! type of a value at runtime, and nothing ever raises: an unrecognized shape
//! is simply `None`.
//!
//! Text that is really a debug rendering of some object (`Foo { .. }`,
//! `com.example.Page@1b6d3586`) is rejected rather than passed off as content.

use serde_json::Value;

use crate::record::{ExternalRecord, Property, PropertyValue, RichText};

/// "This value, as text, or absent."
pub trait AsText {
    fn as_text(&self) -> Option<String>;
}

/// "Field `name` of this record, as text, or absent."
pub trait FieldText {
    fn field_text(&self, field: &str) -> Option<String>;
}

/// Free-function form of [`AsText::as_text`].
pub fn extract_text<T: AsText + ?Sized>(value: &T) -> Option<String> {
    value.as_text()
}

// ---------------------------------------------------------------------------
// Plain strings
// ---------------------------------------------------------------------------

impl AsText for str {
    fn as_text(&self) -> Option<String> {
        let trimmed = self.trim();
        if trimmed.is_empty() || looks_like_debug_repr(trimmed) {
            return None;
        }
        Some(trimmed.to_string())
    }
}

impl AsText for String {
    fn as_text(&self) -> Option<String> {
        self.as_str().as_text()
    }
}

impl<T: AsText> AsText for Option<T> {
    fn as_text(&self) -> Option<String> {
        self.as_ref().and_then(AsText::as_text)
    }
}

// ---------------------------------------------------------------------------
// Typed API property objects
// ---------------------------------------------------------------------------

impl AsText for RichText {
    fn as_text(&self) -> Option<String> {
        self.plain_text
            .as_deref()
            .or(self.text.as_ref().map(|t| t.content.as_str()))
            .and_then(str::as_text)
    }
}

impl AsText for [RichText] {
    fn as_text(&self) -> Option<String> {
        let joined: String = self
            .iter()
            .filter_map(|segment| {
                segment
                    .plain_text
                    .as_deref()
                    .or(segment.text.as_ref().map(|t| t.content.as_str()))
            })
            .collect();
        joined.as_text()
    }
}

impl AsText for PropertyValue {
    fn as_text(&self) -> Option<String> {
        match self {
            PropertyValue::Title { title } => title.as_slice().as_text(),
            PropertyValue::RichText { rich_text } => rich_text.as_slice().as_text(),
            PropertyValue::Select { select } => select.as_ref().and_then(|s| s.name.as_text()),
            PropertyValue::Number { number } => number.map(|n| n.to_string()),
            PropertyValue::Checkbox { checkbox } => Some(checkbox.to_string()),
            // Relation ids are references, not text.
            PropertyValue::Relation { .. } => None,
        }
    }
}

impl AsText for Property {
    fn as_text(&self) -> Option<String> {
        match self {
            Property::Typed(value) => value.as_text(),
            Property::Text(text) => text.as_text(),
            Property::Raw(value) => value.as_text(),
        }
    }
}

// ---------------------------------------------------------------------------
// Generic nested maps
// ---------------------------------------------------------------------------

/// Keys probed, in order, on an untyped object.
const TEXT_KEYS: &[&str] = &[
    "title",
    "rich_text",
    "select",
    "plain_text",
    "text",
    "content",
    "name",
    "string",
];

impl AsText for Value {
    fn as_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => s.as_text(),
            Value::Array(items) => array_text(items),
            Value::Object(map) => {
                // `{"type": "x", "x": ...}`: follow the declared variant first.
                if let Some(inner) = map
                    .get("type")
                    .and_then(Value::as_str)
                    .and_then(|kind| map.get(kind))
                {
                    if let Some(text) = inner.as_text() {
                        return Some(text);
                    }
                }
                TEXT_KEYS
                    .iter()
                    .filter_map(|key| map.get(*key))
                    .find_map(AsText::as_text)
            }
        }
    }
}

/// Rich-text segments concatenate as-is; anything else (multi-select options,
/// string lists) is comma-joined.
fn array_text(items: &[Value]) -> Option<String> {
    let segments: Option<String> = items.iter().map(segment_text).collect();
    if let Some(joined) = segments {
        return joined.as_text();
    }
    let parts: Vec<String> = items.iter().filter_map(AsText::as_text).collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join(", "))
}

/// Untrimmed text of a rich-text segment; `None` if `item` is not one.
fn segment_text(item: &Value) -> Option<&str> {
    item.get("plain_text")
        .and_then(Value::as_str)
        .or_else(|| item.get("text")?.get("content")?.as_str())
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

impl FieldText for ExternalRecord {
    fn field_text(&self, field: &str) -> Option<String> {
        self.properties.get(field).and_then(AsText::as_text)
    }
}

impl FieldText for Value {
    /// Looks under `properties` first, then at the top level.
    fn field_text(&self, field: &str) -> Option<String> {
        self.get("properties")
            .and_then(|props| props.get(field))
            .or_else(|| self.get(field))
            .and_then(AsText::as_text)
    }
}

// ---------------------------------------------------------------------------
// Debug-representation guard
// ---------------------------------------------------------------------------

fn looks_like_debug_repr(s: &str) -> bool {
    is_identity_hash_repr(s) || is_struct_debug_repr(s)
}

/// `com.example.PageProperty@1b6d3586`. A bare word needs a hash of at
/// least six hex digits; a dotted class path may carry any hash.
fn is_identity_hash_repr(s: &str) -> bool {
    let Some((class, hash)) = s.split_once('@') else {
        return false;
    };
    let min_hash = if class.contains('.') { 1 } else { 6 };
    class.starts_with(|c: char| c.is_ascii_alphabetic())
        && !class.ends_with('.')
        && class
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '$'))
        && (min_hash..=16).contains(&hash.len())
        && hash.chars().all(|c| c.is_ascii_hexdigit())
}

/// `PropertyValue { kind: Title }` or `PropertyValue { .. }`
fn is_struct_debug_repr(s: &str) -> bool {
    let Some((name, rest)) = s.split_once(" {") else {
        return false;
    };
    let Some(body) = rest.strip_suffix('}') else {
        return false;
    };
    let body = body.trim();
    name.starts_with(|c: char| c.is_ascii_uppercase())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && (body == ".." || body.contains(':'))
}
