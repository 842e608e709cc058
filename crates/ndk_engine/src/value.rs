//! Dynamic structured value type.
//!
//! Everything the engine stores on the scope or puts into an event is a
//! [`Value`]. Objects keep their keys in insertion order so serialized
//! events read the same way they were built.

use chrono::{SecondsFormat, Utc};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

static NULL: Value = Value::Null;
const EMPTY: &[Value] = &[];

/// A dynamic engine value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Null value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// Double precision float.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered list of values.
    List(Vec<Value>),
    /// Key-value pairs in insertion order.
    Object(Vec<(String, Value)>),
}

/// The kind of a [`Value`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// [`Value::Null`].
    Null,
    /// [`Value::Bool`].
    Bool,
    /// [`Value::Int32`].
    Int32,
    /// [`Value::Double`].
    Double,
    /// [`Value::String`].
    String,
    /// [`Value::List`].
    List,
    /// [`Value::Object`].
    Object,
}

/// Returns the current time as an RFC 3339 UTC timestamp with millisecond
/// precision, e.g. `2020-01-01T00:00:00.000Z`.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl Value {
    /// Creates an empty object.
    pub fn new_object() -> Self {
        Value::Object(Vec::new())
    }

    /// Creates an empty list.
    pub fn new_list() -> Self {
        Value::List(Vec::new())
    }

    /// Creates a string value.
    pub fn new_string(value: impl Into<String>) -> Self {
        Value::String(value.into())
    }

    /// Creates an integer value.
    pub fn new_int32(value: i32) -> Self {
        Value::Int32(value)
    }

    /// Creates a double value.
    pub fn new_double(value: f64) -> Self {
        Value::Double(value)
    }

    /// Creates a boolean value.
    pub fn new_bool(value: bool) -> Self {
        Value::Bool(value)
    }

    /// Creates a breadcrumb object stamped with the current time.
    ///
    /// `type` and `message` are only set when present.
    pub fn new_breadcrumb(kind: Option<&str>, message: Option<&str>) -> Self {
        let mut crumb = Value::new_object();
        crumb.set_by_key("timestamp", Value::new_string(timestamp_now()));
        if let Some(kind) = kind {
            crumb.set_by_key("type", Value::new_string(kind));
        }
        if let Some(message) = message {
            crumb.set_by_key("message", Value::new_string(message));
        }
        crumb
    }

    /// Returns the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int32(_) => ValueKind::Int32,
            Value::Double(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Number of elements of a list or entries of an object; 0 otherwise.
    pub fn len(&self) -> usize {
        match self {
            Value::List(items) => items.len(),
            Value::Object(entries) => entries.len(),
            _ => 0,
        }
    }

    /// Returns true if [`Value::len`] is 0.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up `key` in an object. Yields null for missing keys and for
    /// values that are not objects.
    pub fn get_by_key(&self, key: &str) -> &Value {
        match self {
            Value::Object(entries) => entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v)
                .unwrap_or(&NULL),
            _ => &NULL,
        }
    }

    /// Looks up `index` in a list. Yields null when out of range or when
    /// this value is not a list.
    pub fn get_by_index(&self, index: usize) -> &Value {
        match self {
            Value::List(items) => items.get(index).unwrap_or(&NULL),
            _ => &NULL,
        }
    }

    /// Sets `key` on an object, replacing any previous value in place.
    ///
    /// Returns false if this value is not an object.
    pub fn set_by_key(&mut self, key: &str, value: Value) -> bool {
        let Value::Object(entries) = self else {
            return false;
        };
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value,
            None => entries.push((key.to_string(), value)),
        }
        true
    }

    /// Removes `key` from an object. Returns true if the key was present.
    pub fn remove_by_key(&mut self, key: &str) -> bool {
        let Value::Object(entries) = self else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(k, _)| k != key);
        entries.len() != before
    }

    /// Appends to a list. Returns false if this value is not a list.
    pub fn append(&mut self, value: Value) -> bool {
        match self {
            Value::List(items) => {
                items.push(value);
                true
            }
            _ => false,
        }
    }

    /// Returns the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the string payload, or `""` for any other kind.
    pub fn as_string(&self) -> &str {
        self.as_str().unwrap_or("")
    }

    /// Returns the integer payload, or 0 for any other kind.
    pub fn as_i32(&self) -> i32 {
        match self {
            Value::Int32(n) => *n,
            _ => 0,
        }
    }

    /// Returns the numeric payload as a float; NaN for non-numbers.
    pub fn as_f64(&self) -> f64 {
        match self {
            Value::Int32(n) => f64::from(*n),
            Value::Double(d) => *d,
            _ => f64::NAN,
        }
    }

    /// Returns true for `Bool(true)`.
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    /// Iterates over list items; empty for other kinds.
    pub fn items(&self) -> std::slice::Iter<'_, Value> {
        match self {
            Value::List(items) => items.iter(),
            _ => EMPTY.iter(),
        }
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

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int32(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64().map(i32::try_from) {
                Some(Ok(small)) => Value::Int32(small),
                _ => n.as_f64().map(Value::Double).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int32(n) => serializer.serialize_i32(*n),
            Value::Double(d) if d.is_finite() => serializer.serialize_f64(*d),
            Value::Double(_) => serializer.serialize_unit(),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}
