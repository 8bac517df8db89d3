//! Property predicates.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::model::{GeoShape, GraphElement, Value, ValueType};
use crate::{Error, Result};

/// Comparators for `has`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compare {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
}

impl Compare {
    fn is_ordering(self) -> bool {
        !matches!(self, Compare::Equal | Compare::NotEqual)
    }

    /// `value <op> target`. Values of incompatible types are unequal and unordered.
    pub fn evaluate(self, value: &Value, target: &Value) -> bool {
        if value.is_null() || target.is_null() {
            return false;
        }
        match self {
            Compare::Equal => values_equal(value, target),
            Compare::NotEqual => !values_equal(value, target),
            Compare::GreaterThan => value.compare(target) == Some(Ordering::Greater),
            Compare::GreaterThanEqual => matches!(value.compare(target), Some(Ordering::Greater | Ordering::Equal)),
            Compare::LessThan => value.compare(target) == Some(Ordering::Less),
            Compare::LessThanEqual => matches!(value.compare(target), Some(Ordering::Less | Ordering::Equal)),
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match a.compare(b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => a == b,
    }
}

/// Spatial comparators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeoCompare {
    Within,
}

impl GeoCompare {
    pub fn evaluate(self, value: &Value, shape: &GeoShape) -> bool {
        match self {
            GeoCompare::Within => value.as_geo().is_some_and(|g| g.within(shape)),
        }
    }
}

/// Declared type of a property name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    name: String,
    value_type: ValueType,
}

impl PropertyDefinition {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self { name: name.into(), value_type }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Predicate {
    Has { name: String, compare: Compare, value: Value },
    Range { name: String, low: Value, high: Value },
    Geo { name: String, compare: GeoCompare, shape: GeoShape },
}

impl Predicate {
    pub(crate) fn name(&self) -> &str {
        match self {
            Predicate::Has { name, .. } | Predicate::Range { name, .. } | Predicate::Geo { name, .. } => name,
        }
    }

    /// True when any visible value of the property satisfies the predicate.
    pub(crate) fn matches<T: GraphElement>(&self, element: &T) -> bool {
        let mut values = element.get_property_values(self.name());
        match self {
            Predicate::Has { compare, value, .. } => values.any(|v| compare.evaluate(v, value)),
            Predicate::Range { low, high, .. } => values.any(|v| {
                Compare::GreaterThanEqual.evaluate(v, low) && Compare::LessThanEqual.evaluate(v, high)
            }),
            Predicate::Geo { compare, shape, .. } => values.any(|v| compare.evaluate(v, shape)),
        }
    }

    /// Construction-time checks against the operand types and the
    /// property's declared type, when one exists.
    pub(crate) fn validate(&self, definition: Option<&PropertyDefinition>) -> Result<()> {
        match self {
            Predicate::Has { name, compare, value } => {
                if value.is_null() {
                    return Err(Error::InvalidArgument(format!("has('{name}') needs a non-null value")));
                }
                if compare.is_ordering() && !value.family().is_orderable() {
                    return Err(Error::TypeMismatch {
                        expected: "an orderable value".into(),
                        got: value.type_name().into(),
                    });
                }
                check_declared(definition, value)
            }
            Predicate::Range { name, low, high } => {
                if low.is_null() || high.is_null() {
                    return Err(Error::InvalidArgument(format!("range('{name}') needs non-null bounds")));
                }
                if !low.family().is_orderable() || low.family() != high.family() {
                    return Err(Error::TypeMismatch {
                        expected: low.type_name().into(),
                        got: high.type_name().into(),
                    });
                }
                check_declared(definition, low)
            }
            Predicate::Geo { .. } => match definition {
                Some(def) if def.value_type() != ValueType::GeoShape => Err(Error::TypeMismatch {
                    expected: def.value_type().name().into(),
                    got: ValueType::GeoShape.name().into(),
                }),
                _ => Ok(()),
            },
        }
    }
}

fn check_declared(definition: Option<&PropertyDefinition>, value: &Value) -> Result<()> {
    let Some(def) = definition else {
        return Ok(());
    };
    if def.value_type().family() == value.family() {
        Ok(())
    } else {
        Err(Error::TypeMismatch { expected: def.value_type().name().into(), got: value.type_name().into() })
    }
}
