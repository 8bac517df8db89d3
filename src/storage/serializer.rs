//! Pluggable mapping between typed values and record bytes.

use crate::model::Value;
use crate::Result;

/// Encodes property and metadata values for storage records.
///
/// The graph holds one serializer for its lifetime; records written with one
/// serializer must be read back with the same one.
pub trait ValueSerializer: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn encode(&self, value: &Value) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<Value>;
}

/// JSON encoding through `serde_json`. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonValueSerializer;

impl ValueSerializer for JsonValueSerializer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GeoShape, StreamingValue};
    use chrono::NaiveDate;

    #[test]
    fn test_typed_values_survive_encoding() {
        let s = JsonValueSerializer;
        for value in [
            Value::from(NaiveDate::from_ymd_opt(1989, 2, 5).unwrap()),
            Value::from(GeoShape::point(38.9, -77.0)),
            Value::from(StreamingValue::from_string("value1")),
            Value::from(vec![1, 2, 3]),
        ] {
            let bytes = s.encode(&value).unwrap();
            assert_eq!(s.decode(&bytes).unwrap(), value);
        }
    }

    #[test]
    fn test_garbage_is_a_serialization_error() {
        assert!(matches!(
            JsonValueSerializer.decode(b"not json"),
            Err(crate::Error::Serialization(_))
        ));
    }
}
