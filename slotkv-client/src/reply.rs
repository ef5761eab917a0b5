//! # Reply Translation
//!
//! Purpose: Turn one typed reply into the single text value handed back to
//! the host.
//!
//! ## Rules
//!
//! ```text
//! status / bulk   -> payload, must be valid UTF-8
//! integer         -> decimal digits
//! nil             -> "nil" (fixed-arity path) or "" (argv path)
//! array           -> {e1,e2,...}; nil and error elements leave an empty slot
//! nested array    -> UnsupportedNestedArray, no partial output
//! ```
//!
//! Error replies are intercepted by the dispatcher before translation.

use slotkv_common::{SlotKvError, SlotKvResult};

use crate::resp::RespValue;

/// How a top-level nil reply is rendered.
///
/// The two command entry points have different call-site expectations and
/// intentionally disagree here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NilRendering {
    /// The literal text `nil`.
    Literal,
    /// Empty text.
    Empty,
}

/// Translates a reply into text.
pub fn translate(reply: &RespValue, nil: NilRendering) -> SlotKvResult<String> {
    match reply {
        RespValue::Status(data) | RespValue::Bulk(data) => text(data),
        RespValue::Integer(value) => Ok(value.to_string()),
        RespValue::Nil => Ok(match nil {
            NilRendering::Literal => "nil".to_string(),
            NilRendering::Empty => String::new(),
        }),
        RespValue::Array(items) => translate_array(items),
        RespValue::Error(message) => Err(SlotKvError::command(
            "error reply",
            String::from_utf8_lossy(message),
        )),
    }
}

/// Renders array elements as a brace-delimited, comma-separated list.
pub fn translate_array(items: &[RespValue]) -> SlotKvResult<String> {
    let mut out = String::with_capacity(2 + items.len() * 8);
    out.push('{');
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        match item {
            RespValue::Status(data) | RespValue::Bulk(data) => out.push_str(&text(data)?),
            RespValue::Integer(value) => out.push_str(&value.to_string()),
            RespValue::Nil | RespValue::Error(_) => {}
            RespValue::Array(_) => return Err(SlotKvError::UnsupportedNestedArray),
        }
    }
    out.push('}');
    Ok(out)
}

fn text(data: &[u8]) -> SlotKvResult<String> {
    String::from_utf8(data.to_vec()).map_err(|_| SlotKvError::Encoding)
}
