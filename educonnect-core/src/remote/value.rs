//! Conversion between plain JSON and the REST API's typed values.
//!
//! ```text
//! "Ana"        <-> {"stringValue": "Ana"}
//! 7            <-> {"integerValue": "7"}
//! 1.5          <-> {"doubleValue": 1.5}
//! [1]          <-> {"arrayValue": {"values": [{"integerValue": "1"}]}}
//! {"a": true}  <-> {"mapValue": {"fields": {"a": {"booleanValue": true}}}}
//! ```

use serde_json::{json, Map, Number, Value};

use super::RemoteError;

/// Encodes a field map as a typed `fields` object.
pub fn encode_fields(fields: &Map<String, Value>) -> Value {
    let encoded: Map<String, Value> = fields
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect();
    Value::Object(encoded)
}

/// Decodes a typed `fields` object. A missing object decodes as empty.
pub fn decode_fields(fields: Option<&Value>) -> Result<Map<String, Value>, RemoteError> {
    let Some(fields) = fields else {
        return Ok(Map::new());
    };
    let obj = fields
        .as_object()
        .ok_or_else(|| RemoteError::Decode("fields is not an object".to_string()))?;

    obj.iter()
        .map(|(key, value)| Ok((key.clone(), decode_value(value)?)))
        .collect()
}

pub(crate) fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                json!({ "integerValue": u.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

pub(crate) fn decode_value(value: &Value) -> Result<Value, RemoteError> {
    let obj = value
        .as_object()
        .ok_or_else(|| RemoteError::Decode(format!("expected typed value, got {}", value)))?;
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| RemoteError::Decode("empty typed value".to_string()))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(Value::Bool(inner.as_bool().unwrap_or(false))),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed
                .map(Value::from)
                .ok_or_else(|| RemoteError::Decode(format!("bad integerValue {}", inner)))
        }
        "doubleValue" => Ok(inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => Ok(inner.clone()),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = match inner.get("values").and_then(Value::as_array) {
                Some(values) => values
                    .iter()
                    .map(decode_value)
                    .collect::<Result<Vec<_>, _>>()?,
                None => Vec::new(),
            };
            Ok(Value::Array(values))
        }
        "mapValue" => Ok(Value::Object(decode_fields(inner.get("fields"))?)),
        other => Err(RemoteError::Decode(format!("unknown value type {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode_value(&json!(null)), json!({"nullValue": null}));
        assert_eq!(encode_value(&json!(true)), json!({"booleanValue": true}));
        assert_eq!(encode_value(&json!(42)), json!({"integerValue": "42"}));
        assert_eq!(encode_value(&json!(1.5)), json!({"doubleValue": 1.5}));
        assert_eq!(encode_value(&json!("hi")), json!({"stringValue": "hi"}));
    }

    #[test]
    fn test_encode_nested() {
        let encoded = encode_value(&json!({"tags": ["a"], "meta": {"n": 1}}));
        assert_eq!(
            encoded,
            json!({"mapValue": {"fields": {
                "tags": {"arrayValue": {"values": [{"stringValue": "a"}]}},
                "meta": {"mapValue": {"fields": {"n": {"integerValue": "1"}}}}
            }}})
        );
    }

    #[test]
    fn test_decode_document_fields() {
        let fields = json!({
            "id": {"integerValue": "1700000000000"},
            "name": {"stringValue": "Colegio Central"},
            "rating": {"doubleValue": 4.5},
            "active": {"booleanValue": true},
            "createdAt": {"timestampValue": "2024-01-01T00:00:00Z"},
            "empty": {"arrayValue": {}},
            "address": {"mapValue": {}}
        });

        let decoded = decode_fields(Some(&fields)).unwrap();
        assert_eq!(decoded["id"], json!(1_700_000_000_000i64));
        assert_eq!(decoded["name"], json!("Colegio Central"));
        assert_eq!(decoded["rating"], json!(4.5));
        assert_eq!(decoded["active"], json!(true));
        assert_eq!(decoded["createdAt"], json!("2024-01-01T00:00:00Z"));
        assert_eq!(decoded["empty"], json!([]));
        assert_eq!(decoded["address"], json!({}));
    }

    #[test]
    fn test_decode_missing_fields_is_empty() {
        assert!(decode_fields(None).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let result = decode_value(&json!({"mysteryValue": 1}));
        assert!(matches!(result, Err(RemoteError::Decode(_))));
    }

    #[test]
    fn test_encode_then_decode_preserves_mixed_document() {
        let original = json!({"id": 3, "title": "Feria", "likes": [1, 2], "meta": {"x": null}});
        let map = original.as_object().unwrap();
        let decoded = decode_fields(Some(&encode_fields(map))).unwrap();
        assert_eq!(Value::Object(decoded), original);
    }
}
