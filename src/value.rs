use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;

/// Ordered key/value container backing every LACON scope. Key order is
/// observable in the JSON output, so insertion order must be preserved.
pub type Map = IndexMap<String, Value>;

/// A compiled LACON value.
///
/// `Spread` is transient: it is produced by `@import...` and unwrapped by
/// whichever site receives it (inline assignment, array item, multi-key
/// fan-out). It never survives into a finished document.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(Number),
    Bool(bool),
    Object(Map),
    Array(Vec<Value>),
    Spread(Box<Value>),
}

/// Numeric scalar. Integer and float forms are kept apart so that `1`
/// serializes as `1` and not `1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Value {
    pub fn empty_object() -> Value {
        Value::Object(Map::new())
    }

    /// Strips a spread wrapper, if any, and returns the payload.
    pub fn unwrap_spread(self) -> Value {
        match self {
            Value::Spread(inner) => *inner,
            other => other,
        }
    }

    pub fn is_spread(&self) -> bool {
        matches!(self, Value::Spread(_))
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl Number {
    /// Parses a numeral already vetted by the line grammar (optional `-`,
    /// digits, optional fraction). Falls back to a float when the integer
    /// form overflows.
    pub(crate) fn from_literal(text: &str) -> Option<Number> {
        if text.contains('.') {
            text.parse::<f64>().ok().map(Number::Float)
        } else {
            match text.parse::<i64>() {
                Ok(i) => Some(Number::Int(i)),
                Err(_) => text.parse::<f64>().ok().map(Number::Float),
            }
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Number(n) => n.serialize(serializer),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
            Value::Array(items) => {
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    out.serialize_element(item)?;
                }
                out.end()
            }
            // Spreads are unwrapped before storage; if one leaks through,
            // rendering the payload is still the closest correct output.
            Value::Spread(inner) => inner.serialize(serializer),
        }
    }
}

impl Serialize for Number {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Number::Int(i) => serializer.serialize_i64(*i),
            // Whole-valued floats print as integers, matching the notation
            // they were written in ("2.0" still parses as a float).
            Number::Float(x) if x.is_finite() && x.fract() == 0.0 && (*x as i64 as f64 == *x) => {
                serializer.serialize_i64(*x as i64)
            }
            Number::Float(x) => serializer.serialize_f64(*x),
        }
    }
}

/// Returns the object stored under `key`, replacing whatever non-object
/// value may currently occupy the slot.
pub(crate) fn ensure_object<'a>(map: &'a mut Map, key: &str) -> &'a mut Map {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(Value::empty_object);
    if !matches!(slot, Value::Object(_)) {
        *slot = Value::empty_object();
    }
    match slot {
        Value::Object(obj) => obj,
        _ => unreachable!("slot was just replaced with an object"),
    }
}

/// Walks `path`, creating intermediate objects as needed, and returns the
/// innermost map.
pub(crate) fn descend<'a>(map: &'a mut Map, path: &[&str]) -> &'a mut Map {
    let mut current = map;
    for part in path {
        current = ensure_object(current, part);
    }
    current
}

/// Merges `value` into `target` the way imports merge: object pairs are
/// copied in order (existing keys keep their position, values replaced),
/// arrays contribute decimal-index keys, scalars contribute nothing.
pub(crate) fn merge_into_map(target: &mut Map, value: Value) {
    match value {
        Value::Object(pairs) => {
            for (key, item) in pairs {
                target.insert(key, item);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.into_iter().enumerate() {
                target.insert(index.to_string(), item);
            }
        }
        Value::Spread(inner) => merge_into_map(target, *inner),
        _ => {}
    }
}

/// Pushes `value` onto an array under array-mode flattening rules: spread
/// arrays contribute their elements, spread objects their field values,
/// anything else lands as a single element.
pub(crate) fn push_flattened(items: &mut Vec<Value>, value: Value) {
    match value {
        Value::Spread(inner) => match *inner {
            Value::Array(elems) => items.extend(elems),
            Value::Object(map) => items.extend(map.into_values()),
            other => items.push(other),
        },
        other => items.push(other),
    }
}
