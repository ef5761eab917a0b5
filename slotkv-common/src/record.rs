//! # Structured Records
//!
//! Purpose: Model a host record as an ordered list of named, typed fields so
//! it can be projected into a flat hash write.
//!
//! ## Design Principles
//! 1. **Declaration Order**: Fields keep the order they were declared in; the
//!    projection walks them in that order.
//! 2. **Dropped Columns**: A field can be marked as dropped from the record's
//!    shape and is then skipped entirely.
//! 3. **Type-Owned Rendering**: Each value variant knows its own text output,
//!    mirroring how a database prints a column of that type.
//!
//! ## Text Rendering
//!
//! ```text
//! Null        -> (no text)
//! Bool        -> t | f
//! Int         -> 42
//! Float       -> 1.5 | NaN | Infinity | -Infinity
//! Text        -> as-is
//! Bytes       -> \x0aff
//! Json        -> {"a":1}
//! Array       -> {1,NULL,"a b"}
//! ```

use std::fmt::Write as _;

use serde_json::Value as JsonValue;

use crate::error::{SlotKvError, SlotKvResult};

/// Typed value of a single record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Json(JsonValue),
    Array(Vec<FieldValue>),
}

impl FieldValue {
    /// Returns true for SQL-style null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Renders the value as text, or `None` for null.
    pub fn render(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            other => {
                let mut out = String::new();
                other.render_into(&mut out);
                Some(out)
            }
        }
    }

    fn render_into(&self, out: &mut String) {
        match self {
            FieldValue::Null => {}
            FieldValue::Bool(value) => out.push(if *value { 't' } else { 'f' }),
            FieldValue::Int(value) => {
                let _ = write!(out, "{}", value);
            }
            FieldValue::Float(value) => render_float(*value, out),
            FieldValue::Text(text) => out.push_str(text),
            FieldValue::Bytes(data) => {
                out.push_str("\\x");
                for byte in data {
                    let _ = write!(out, "{:02x}", byte);
                }
            }
            FieldValue::Json(value) => out.push_str(&value.to_string()),
            FieldValue::Array(items) => {
                out.push('{');
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        out.push(',');
                    }
                    render_array_element(item, out);
                }
                out.push('}');
            }
        }
    }
}

fn render_float(value: f64, out: &mut String) {
    if value.is_nan() {
        out.push_str("NaN");
    } else if value.is_infinite() {
        out.push_str(if value > 0.0 { "Infinity" } else { "-Infinity" });
    } else {
        let _ = write!(out, "{}", value);
    }
}

fn render_array_element(item: &FieldValue, out: &mut String) {
    match item {
        FieldValue::Null => out.push_str("NULL"),
        FieldValue::Array(_) => item.render_into(out),
        _ => {
            let mut text = String::new();
            item.render_into(&mut text);
            if needs_quotes(&text) {
                out.push('"');
                for ch in text.chars() {
                    if ch == '"' || ch == '\\' {
                        out.push('\\');
                    }
                    out.push(ch);
                }
                out.push('"');
            } else {
                out.push_str(&text);
            }
        }
    }
}

fn needs_quotes(text: &str) -> bool {
    text.is_empty()
        || text.eq_ignore_ascii_case("NULL")
        || text
            .chars()
            .any(|ch| matches!(ch, '{' | '}' | ',' | '"' | '\\') || ch.is_ascii_whitespace())
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value as i64)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// One named field of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
    /// Dropped fields stay in the shape but contribute nothing.
    pub dropped: bool,
}

/// Ordered collection of named fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Record { fields: Vec::new() }
    }

    /// Appends a live field (builder style).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.push(name, value);
        self
    }

    /// Appends a field that has been dropped from the record's shape.
    pub fn with_dropped(mut self, name: impl Into<String>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            value: FieldValue::Null,
            dropped: true,
        });
        self
    }

    /// Appends a live field.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.push(Field {
            name: name.into(),
            value: value.into(),
            dropped: false,
        });
    }

    /// Returns all fields in declaration order, dropped ones included.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Iterates over live (non-dropped) fields in declaration order.
    pub fn live_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|field| !field.dropped)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Builds a record from a JSON object, keeping key order.
    ///
    /// # Errors
    /// Returns `SlotKvError::InvalidArgument` when `value` is not an object.
    pub fn from_json(value: &JsonValue) -> SlotKvResult<Self> {
        let object = value
            .as_object()
            .ok_or(SlotKvError::InvalidArgument("record (expected a JSON object)"))?;
        let mut record = Record::new();
        for (name, value) in object {
            record.push(name.clone(), field_from_json(value));
        }
        Ok(record)
    }
}

fn field_from_json(value: &JsonValue) -> FieldValue {
    match value {
        JsonValue::Null => FieldValue::Null,
        JsonValue::Bool(flag) => FieldValue::Bool(*flag),
        JsonValue::Number(number) => {
            if let Some(int) = number.as_i64() {
                FieldValue::Int(int)
            } else if number.is_u64() {
                // Out of i64 range; keep the exact digits.
                FieldValue::Text(number.to_string())
            } else {
                FieldValue::Float(number.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(text) => FieldValue::Text(text.clone()),
        JsonValue::Array(items) if items.iter().all(|item| !item.is_object()) => {
            FieldValue::Array(items.iter().map(field_from_json).collect())
        }
        other => FieldValue::Json(other.clone()),
    }
}
