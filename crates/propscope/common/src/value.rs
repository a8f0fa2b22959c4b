// Propscope
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Attribute values observed on components
//!
//! Component attributes are dynamically typed at the instrumentation boundary.
//! They are modelled here as a closed variant so that deep equality and
//! cloning can be defined per kind.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Attribute map passed to the tracker for a single observation
pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// Inferred kind of an attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Function,
    Undefined,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Object => "object",
            ValueKind::Array => "array",
            ValueKind::Function => "function",
            ValueKind::Undefined => "undefined",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct FunctionIdentity {
    name: String,
}

/// Handle to a callable attribute (event handlers, render props).
///
/// Callables are never deep compared: two handles are equal only when they
/// were cloned from the same `FunctionRef`. Cloning shares the identity.
#[derive(Clone)]
pub struct FunctionRef {
    identity: Arc<FunctionIdentity>,
}

impl FunctionRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            identity: Arc::new(FunctionIdentity { name: name.into() }),
        }
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn same_identity(&self, other: &FunctionRef) -> bool {
        Arc::ptr_eq(&self.identity, &other.identity)
    }
}

impl PartialEq for FunctionRef {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity(other)
    }
}

impl fmt::Debug for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionRef({})", self.identity.name)
    }
}

/// A single attribute value as seen by the instrumentation hook
#[derive(Debug, Clone, Default)]
pub enum AttributeValue {
    #[default]
    Undefined,
    String(String),
    Number(f64),
    Boolean(bool),
    /// Key order is preserved and significant for equality
    Object(Vec<(String, AttributeValue)>),
    Array(Vec<AttributeValue>),
    Function(FunctionRef),
}

impl AttributeValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            AttributeValue::Undefined => ValueKind::Undefined,
            AttributeValue::String(_) => ValueKind::String,
            AttributeValue::Number(_) => ValueKind::Number,
            AttributeValue::Boolean(_) => ValueKind::Boolean,
            AttributeValue::Object(_) => ValueKind::Object,
            AttributeValue::Array(_) => ValueKind::Array,
            AttributeValue::Function(_) => ValueKind::Function,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, AttributeValue::Undefined)
    }

    /// Build an object value from key/value pairs, keeping their order
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<AttributeValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        AttributeValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn array<V, I>(items: I) -> Self
    where
        V: Into<AttributeValue>,
        I: IntoIterator<Item = V>,
    {
        AttributeValue::Array(items.into_iter().map(Into::into).collect())
    }

    /// Looks up a key on an object value
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        match self {
            AttributeValue::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttributeValue::Undefined, AttributeValue::Undefined) => true,
            (AttributeValue::String(a), AttributeValue::String(b)) => a == b,
            // NaN must equal NaN or a value would differ from its own clone
            (AttributeValue::Number(a), AttributeValue::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (AttributeValue::Boolean(a), AttributeValue::Boolean(b)) => a == b,
            (AttributeValue::Object(a), AttributeValue::Object(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|((ka, va), (kb, vb))| ka == kb && va == vb)
            }
            (AttributeValue::Array(a), AttributeValue::Array(b)) => a == b,
            (AttributeValue::Function(a), AttributeValue::Function(b)) => a.same_identity(b),
            _ => false,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(value as f64)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Number(value as f64)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

impl From<FunctionRef> for AttributeValue {
    fn from(value: FunctionRef) -> Self {
        AttributeValue::Function(value)
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(AttributeValue::Undefined)
    }
}

impl From<serde_json::Value> for AttributeValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => AttributeValue::Undefined,
            Value::Bool(b) => AttributeValue::Boolean(b),
            // Out-of-range numbers degrade to NaN rather than failing ingestion
            Value::Number(n) => AttributeValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => AttributeValue::String(s),
            Value::Array(items) => AttributeValue::Array(items.into_iter().map(AttributeValue::from).collect()),
            Value::Object(map) => AttributeValue::Object(map.into_iter().map(|(k, v)| (k, AttributeValue::from(v))).collect()),
        }
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AttributeValue::Undefined => serializer.serialize_none(),
            AttributeValue::String(s) => serializer.serialize_str(s),
            AttributeValue::Number(n) => serializer.serialize_f64(*n),
            AttributeValue::Boolean(b) => serializer.serialize_bool(*b),
            AttributeValue::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            AttributeValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            AttributeValue::Function(func) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("function", func.name())?;
                map.end()
            }
        }
    }
}
