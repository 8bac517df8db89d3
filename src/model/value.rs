//! Typed property values.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GeoShape, StreamingValue};

/// A property value.
///
/// Covers the types a visibility-labelled property may hold:
/// - Scalars: Bool, Int, Float, String, Bytes
/// - Containers: List
/// - Temporal: Date, DateTime
/// - Spatial: Geo
/// - Large content: Stream (inline when small, external reference when large)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),

    // Temporal types
    Date(NaiveDate),
    DateTime(DateTime<Utc>),

    // Spatial
    Geo(GeoShape),

    // Large content
    Stream(StreamingValue),
}

/// Declared type of a property, used by property definitions and streaming values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Boolean,
    Integer,
    Float,
    String,
    Bytes,
    List,
    Date,
    DateTime,
    GeoShape,
    Stream,
}

/// Comparison family. Values compare only within one orderable family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFamily {
    Boolean,
    Numeric,
    Text,
    Binary,
    Temporal,
    Spatial,
    Unordered,
}

impl ValueFamily {
    pub fn is_orderable(self) -> bool {
        !matches!(self, ValueFamily::Spatial | ValueFamily::Unordered)
    }
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Boolean => "BOOLEAN",
            ValueType::Integer => "INTEGER",
            ValueType::Float => "FLOAT",
            ValueType::String => "STRING",
            ValueType::Bytes => "BYTES",
            ValueType::List => "LIST",
            ValueType::Date => "DATE",
            ValueType::DateTime => "DATETIME",
            ValueType::GeoShape => "GEOSHAPE",
            ValueType::Stream => "STREAM",
        }
    }

    pub fn family(self) -> ValueFamily {
        match self {
            ValueType::Boolean => ValueFamily::Boolean,
            ValueType::Integer | ValueType::Float => ValueFamily::Numeric,
            ValueType::String => ValueFamily::Text,
            ValueType::Bytes => ValueFamily::Binary,
            ValueType::Date | ValueType::DateTime => ValueFamily::Temporal,
            ValueType::GeoShape => ValueFamily::Spatial,
            ValueType::List | ValueType::Stream => ValueFamily::Unordered,
        }
    }
}

// ============================================================================
// Type checking
// ============================================================================

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::String(_) => "STRING",
            Value::Bytes(_) => "BYTES",
            Value::List(_) => "LIST",
            Value::Date(_) => "DATE",
            Value::DateTime(_) => "DATETIME",
            Value::Geo(_) => "GEOSHAPE",
            Value::Stream(_) => "STREAM",
        }
    }

    /// The declared type this value satisfies. `Null` has none.
    pub fn value_type(&self) -> Option<ValueType> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => ValueType::Boolean,
            Value::Int(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Bytes(_) => ValueType::Bytes,
            Value::List(_) => ValueType::List,
            Value::Date(_) => ValueType::Date,
            Value::DateTime(_) => ValueType::DateTime,
            Value::Geo(_) => ValueType::GeoShape,
            Value::Stream(_) => ValueType::Stream,
        })
    }

    pub fn family(&self) -> ValueFamily {
        self.value_type().map_or(ValueFamily::Unordered, ValueType::family)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer content. Floats with no fractional part also qualify.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Numeric content widened to `f64`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_geo(&self) -> Option<&GeoShape> {
        match self {
            Value::Geo(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&StreamingValue> {
        match self {
            Value::Stream(s) => Some(s),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

macro_rules! value_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for Value {
                fn from(v: $source) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    f64 => Float,
    String => String,
    &str => String,
    NaiveDate => Date,
    DateTime<Utc> => DateTime,
    GeoShape => Geo,
    StreamingValue => Stream,
}

/// Lists convert element-wise.
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// `None` becomes `Value::Null`, which property writes reject.
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Value::Bytes(b) => write!(f, "<bytes[{}]>", b.len()),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Date(d) => write!(f, "{d}"),
            Value::DateTime(dt) => write!(f, "{dt}"),
            Value::Geo(g) => write!(f, "{g}"),
            Value::Stream(s) => write!(f, "<stream {:?}[{}]>", s.value_type(), s.len()),
        }
    }
}

// ============================================================================
// Comparison (natural ordering within a family)
// ============================================================================

impl Value {
    /// Order two values of the same family, or `None` when they are not
    /// comparable. `Null` compares with nothing.
    ///
    /// Numbers compare across Int/Float, dates compare against datetimes at
    /// midnight UTC, strings compare lexically.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.partial_cmp(b),
            (Value::Date(a), Value::Date(b)) => a.partial_cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.partial_cmp(b),
            (Value::Date(a), Value::DateTime(b)) => midnight_utc(*a).partial_cmp(b),
            (Value::DateTime(a), Value::Date(b)) => a.partial_cmp(&midnight_utc(*b)),
            _ => None,
        }
    }
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
