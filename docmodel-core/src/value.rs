//! The in-memory value representation for document fields.
//!
//! [`Value`] is the dynamically typed value a document attribute holds
//! between validation and serialization. Scalars reuse the BSON wire types
//! where one exists (timestamps, identities); containers nest recursively;
//! reference fields hold either a full [`Document`](crate::document::Document)
//! or a lazy [`PointerRecord`](crate::reference::PointerRecord) handle.

use std::collections::HashMap;

use bson::{Binary, Bson, spec::BinarySubtype};

use crate::{document::Document, reference::PointerRecord};

/// A dynamically typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit null. Treated like an absent value by validation.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// String value.
    String(String),
    /// Timestamp with millisecond precision.
    DateTime(bson::DateTime),
    /// Universally unique identifier.
    Uuid(bson::Uuid),
    /// Opaque byte blob.
    Bytes(Vec<u8>),
    /// Ordered sequence of values.
    List(Vec<Value>),
    /// Unordered collection of distinct values.
    Set(Vec<Value>),
    /// String-keyed mapping of values.
    Dict(HashMap<String, Value>),
    /// An owned nested document (embedded or referenced instance).
    Document(Box<Document>),
    /// A lazy, not-yet-dereferenced handle to a stored document.
    Pointer(PointerRecord),
}

impl Value {
    /// Short type name used in mismatch diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
            Value::Uuid(_) => "uuid",
            Value::Bytes(_) => "binary",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Dict(_) => "dict",
            Value::Document(_) => "document",
            Value::Pointer(_) => "pointer",
        }
    }

    /// True for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Wraps a byte blob. Separate from the `From` impls because `Vec<u8>`
    /// would clash with `Vec<Value>`.
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(bytes.into())
    }

    /// Converts to the generic BSON wire form, without schema knowledge.
    ///
    /// Used for [`Dynamic`](crate::field::FieldKind::Dynamic) fields. Nested
    /// documents need a schema-aware codec and are rejected here.
    pub fn to_bson(&self) -> Option<Bson> {
        match self {
            Value::Null => Some(Bson::Null),
            Value::Bool(b) => Some(Bson::Boolean(*b)),
            Value::Int(i) => Some(Bson::Int64(*i)),
            Value::Float(f) => Some(Bson::Double(*f)),
            Value::String(s) => Some(Bson::String(s.clone())),
            Value::DateTime(dt) => Some(Bson::DateTime(*dt)),
            Value::Uuid(u) => Some(Bson::from(*u)),
            Value::Bytes(b) => Some(Bson::Binary(Binary {
                subtype: BinarySubtype::Generic,
                bytes: b.clone(),
            })),
            Value::List(items) | Value::Set(items) => items
                .iter()
                .map(Value::to_bson)
                .collect::<Option<Vec<_>>>()
                .map(Bson::Array),
            Value::Dict(map) => map
                .iter()
                .map(|(k, v)| v.to_bson().map(|b| (k.clone(), b)))
                .collect::<Option<bson::Document>>()
                .map(Bson::Document),
            Value::Pointer(pointer) => Some(Bson::Document(pointer.to_storage())),
            Value::Document(_) => None,
        }
    }

    /// Converts from the generic BSON wire form, without schema knowledge.
    ///
    /// Pointer-shaped sub-documents come back as [`Value::Pointer`]; every
    /// other sub-document becomes a [`Value::Dict`].
    pub fn from_bson(bson: &Bson) -> Self {
        match bson {
            Bson::Null => Value::Null,
            Bson::Boolean(b) => Value::Bool(*b),
            Bson::Int32(i) => Value::Int(i64::from(*i)),
            Bson::Int64(i) => Value::Int(*i),
            Bson::Double(f) => Value::Float(*f),
            Bson::String(s) => Value::String(s.clone()),
            Bson::DateTime(dt) => Value::DateTime(*dt),
            Bson::Binary(binary) if binary.subtype == BinarySubtype::Uuid => {
                match <[u8; 16]>::try_from(binary.bytes.as_slice()) {
                    Ok(bytes) => Value::Uuid(bson::Uuid::from_bytes(bytes)),
                    Err(_) => Value::Bytes(binary.bytes.clone()),
                }
            }
            Bson::Binary(binary) => Value::Bytes(binary.bytes.clone()),
            Bson::Array(items) => Value::List(items.iter().map(Value::from_bson).collect()),
            Bson::Document(map) => match PointerRecord::from_storage(map) {
                Some(pointer) => Value::Pointer(pointer),
                None => Value::Dict(
                    map.iter()
                        .map(|(k, v)| (k.clone(), Value::from_bson(v)))
                        .collect(),
                ),
            },
            other => Value::String(other.to_string()),
        }
    }

    /// Converts from a JSON value. Numbers become integers when they fit in
    /// an `i64`, floats otherwise.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Dict(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts to a JSON value. Returns `None` for values with no JSON
    /// analogue (documents, pointers, non-UTF-8 blobs are rendered as-is).
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Value::Null => Some(serde_json::Value::Null),
            Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
            Value::Int(i) => Some(serde_json::Value::from(*i)),
            Value::Float(f) => serde_json::Number::from_f64(*f).map(serde_json::Value::Number),
            Value::String(s) => Some(serde_json::Value::String(s.clone())),
            Value::DateTime(dt) => Some(serde_json::Value::String(
                dt.try_to_rfc3339_string().ok()?,
            )),
            Value::Uuid(u) => Some(serde_json::Value::String(u.to_string())),
            Value::Bytes(_) | Value::Document(_) | Value::Pointer(_) => None,
            Value::List(items) | Value::Set(items) => items
                .iter()
                .map(Value::to_json)
                .collect::<Option<Vec<_>>>()
                .map(serde_json::Value::Array),
            Value::Dict(map) => map
                .iter()
                .map(|(k, v)| v.to_json().map(|j| (k.clone(), j)))
                .collect::<Option<serde_json::Map<_, _>>>()
                .map(serde_json::Value::Object),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bson::DateTime> for Value {
    fn from(value: bson::DateTime) -> Self {
        Value::DateTime(value)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for Value {
    fn from(value: chrono::DateTime<chrono::Utc>) -> Self {
        Value::DateTime(bson::DateTime::from_chrono(value))
    }
}

impl From<bson::Uuid> for Value {
    fn from(value: bson::Uuid) -> Self {
        Value::Uuid(value)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(value: uuid::Uuid) -> Self {
        Value::Uuid(bson::Uuid::from_bytes(value.into_bytes()))
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(value: HashMap<String, Value>) -> Self {
        Value::Dict(value)
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Value::Document(Box::new(value))
    }
}

impl From<PointerRecord> for Value {
    fn from(value: PointerRecord) -> Self {
        Value::Pointer(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip() {
        let json: serde_json::Value = serde_json::from_str(
            r#"{"name": "rose", "petals": 5, "weight": 0.5, "tags": ["red", "thorny"]}"#,
        )
        .unwrap();
        let value = Value::from_json(&json);

        match &value {
            Value::Dict(map) => {
                assert_eq!(map.get("name"), Some(&Value::String("rose".into())));
                assert_eq!(map.get("petals"), Some(&Value::Int(5)));
                assert_eq!(map.get("weight"), Some(&Value::Float(0.5)));
            }
            other => panic!("expected dict, got {other:?}"),
        }
        assert_eq!(value.to_json(), Some(json));
    }

    #[test]
    fn generic_bson_round_trip() {
        let value = Value::List(vec![
            Value::Int(1),
            Value::String("two".into()),
            Value::Bool(true),
            Value::Null,
        ]);
        let bson = value.to_bson().unwrap();
        assert_eq!(Value::from_bson(&bson), value);
    }

    #[test]
    fn uuid_survives_bson() {
        let id = bson::Uuid::new();
        let bson = Value::Uuid(id).to_bson().unwrap();
        assert_eq!(Value::from_bson(&bson), Value::Uuid(id));
    }
}
