/// Test Value Model
///
/// **Core Responsibility:**
/// Represent every test input, expected output and actual output as one
/// recursive tagged union.
///
/// **Equality Rules:**
/// - Same variant, compared recursively
/// - Sequences: order-sensitive, element-wise
/// - Mappings: same key set, per-key equality
/// - Numbers: `Int(3) == Float(3.0)` (numeric equality, the only cross-variant rule)
/// - Integers outside the `i64` range are kept digit-for-digit in `BigInt`
///   and never collapse into a nearby float
/// - Booleans never equal numbers
/// - `NaN` equals nothing, including itself
/// - `Opaque` only ever comes back from the function under test, so it never
///   equals an expected value
///
/// **Rendering:**
/// `Display` is the canonical textual form used in mismatch messages. It is
/// JSON-shaped with `", "` and `": "` separators and always prints a fractional
/// part for floats, so `6` and `6.0` stay distinguishable in error text.
///
/// **Wire Form:**
/// Parsing goes through `serde_json::Value` with `arbitrary_precision`, so the
/// exact digits of every number are seen before anything is narrowed.

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    /// Integer outside the `i64` range, as canonical decimal digits
    BigInt(String),
    Float(f64),
    String(String),
    Sequence(Vec<Value>),
    Mapping(BTreeMap<String, Value>),
    /// Returned value with no JSON form (tuple, set, object), kept as its repr
    Opaque(String),
}

impl Value {
    /// True for `Sequence` values
    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::Sequence(_))
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Short variant name, used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::BigInt(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
            Value::Opaque(_) => "opaque",
        }
    }

    /// Exact conversion of a parsed JSON number
    fn from_number(number: &serde_json::Number) -> Option<Value> {
        if let Some(i) = number.as_i64() {
            return Some(Value::Int(i));
        }
        let text = number.to_string();
        if is_integer_literal(&text) {
            return Some(Value::BigInt(text));
        }
        number.as_f64().map(Value::Float)
    }
}

fn is_integer_literal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Exact comparison of an integer against a float.
/// Avoids `i as f64`, which rounds integers above 2^53.
fn int_eq_float(i: i64, f: f64) -> bool {
    if !f.is_finite() || f.fract() != 0.0 {
        return false;
    }
    // 2^63 is exactly representable; anything at or above it is out of range.
    if f < -9_223_372_036_854_775_808.0 || f >= 9_223_372_036_854_775_808.0 {
        return false;
    }
    f as i64 == i
}

/// Exact comparison of an out-of-range integer against a float.
/// Fixed-precision formatting prints the float's exact integral value.
fn big_int_eq_float(digits: &str, f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && format!("{:.0}", f) == digits
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => {
                int_eq_float(*i, *f)
            }
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::BigInt(d), Value::Float(f)) | (Value::Float(f), Value::BigInt(d)) => {
                big_int_eq_float(d, *f)
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a == b,
            (Value::Mapping(a), Value::Mapping(b)) => a == b,
            _ => false,
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_nan() {
        write!(f, "NaN")
    } else if x.is_infinite() {
        write!(f, "{}", if x > 0.0 { "Infinity" } else { "-Infinity" })
    } else if x.fract() == 0.0 && x.abs() < 1e16 {
        write!(f, "{:.1}", x)
    } else {
        write!(f, "{}", x)
    }
}

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    match serde_json::to_string(s) {
        Ok(quoted) => f.write_str(&quoted),
        Err(_) => write!(f, "{:?}", s),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::BigInt(digits) => f.write_str(digits),
            Value::Float(x) => write_float(f, *x),
            Value::Opaque(repr) => f.write_str(repr),
            Value::String(s) => write_string(f, s),
            Value::Sequence(items) => {
                write!(f, "[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Mapping(entries) => {
                write!(f, "{{")?;
                for (idx, (key, item)) in entries.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write_string(f, key)?;
                    write!(f, ": {}", item)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::BigInt(digits) => serde_json::from_str::<serde_json::Number>(digits)
                .map_err(S::Error::custom)?
                .serialize(serializer),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::String(s) | Value::Opaque(s) => serializer.serialize_str(s),
            Value::Sequence(items) => serializer.collect_seq(items),
            Value::Mapping(entries) => serializer.collect_map(entries),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Value::try_from(raw).map_err(D::Error::custom)
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = String;

    fn try_from(raw: serde_json::Value) -> Result<Self, Self::Error> {
        Ok(match raw {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::from_number(&n)
                .ok_or_else(|| format!("number out of range: {}", n))?,
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Sequence(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            serde_json::Value::Object(entries) => Value::Mapping(
                entries
                    .into_iter()
                    .map(|(k, v)| Value::try_from(v).map(|v| (k, v)))
                    .collect::<Result<_, _>>()?,
            ),
        })
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

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
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

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Sequence(items.into_iter().map(Into::into).collect())
    }
}
