//! Loosely-typed wire values.
//!
//! A wire value is the parsed body of one HTTP response (or the body of one
//! outbound request) before any schema-aware decoding runs. `serde_json`
//! with `preserve_order` gives exactly the shape the protocol needs: null,
//! bool, number, string, array, and ordered objects with unique string keys.
//! Values live for one response and are discarded after decode.

pub use serde_json::{Map, Value as WireValue};

use crate::errors::SchemaError;

/// An ordered string-keyed object.
pub type WireObject = Map<String, WireValue>;

/// Shape name used in schema errors.
pub fn shape_of(value: &WireValue) -> &'static str {
    match value {
        WireValue::Null => "null",
        WireValue::Bool(_) => "bool",
        WireValue::Number(_) => "number",
        WireValue::String(_) => "string",
        WireValue::Array(_) => "array",
        WireValue::Object(_) => "object",
    }
}

pub fn as_object(value: &WireValue) -> Result<&WireObject, SchemaError> {
    value.as_object().ok_or(SchemaError::Shape {
        expected: "object",
        found: shape_of(value),
    })
}
