//! Translation between plain JSON and Firestore's typed value encoding.
//!
//! Firestore wraps every value in a single-key object naming its type, for
//! example `{"stringValue": "Kia"}` or `{"integerValue": "5"}`. Integers
//! travel as strings. RFC 3339 strings are stored as timestamps and come
//! back as strings.

use chrono::DateTime;
use serde_json::{json, Map, Value};

use super::Document;

/// Encode a JSON value as a Firestore value.
#[must_use]
pub fn encode_value(value: &Value) -> Value {
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
        Value::String(s) if DateTime::parse_from_rfc3339(s).is_ok() => {
            json!({ "timestampValue": s })
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

/// Encode document fields as a Firestore `fields` object.
#[must_use]
pub fn encode_fields(fields: &Document) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

/// Decode a Firestore value into plain JSON.
///
/// Timestamps, references and bytes come back as strings.
///
/// # Errors
///
/// Returns a description of the problem if the value is not a recognised
/// Firestore encoding.
pub fn decode_value(value: &Value) -> Result<Value, String> {
    let Value::Object(wrapper) = value else {
        return Err(format!("expected a typed value object, got {value}"));
    };
    let mut entries = wrapper.iter();
    let (Some((kind, inner)), None) = (entries.next(), entries.next()) else {
        return Err("typed value must have exactly one key".to_string());
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| format!("booleanValue is not a bool: {inner}")),
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| format!("integerValue {s:?}: {e}")),
            Value::Number(n) => Ok(Value::Number(n.clone())),
            other => Err(format!("integerValue is not a number: {other}")),
        },
        "doubleValue" => match inner {
            Value::Number(n) => Ok(Value::Number(n.clone())),
            other => Err(format!("doubleValue is not finite: {other}")),
        },
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| format!("{kind} is not a string: {inner}")),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = inner.get("values").and_then(Value::as_array);
            values
                .map_or_else(|| Ok(Vec::new()), |items| items.iter().map(decode_value).collect())
                .map(Value::Array)
        }
        "mapValue" => decode_fields(inner.get("fields")).map(Value::Object),
        other => Err(format!("unsupported value type {other}")),
    }
}

/// Decode a Firestore `fields` object; an absent object is an empty document.
///
/// # Errors
///
/// Returns a description of the first field that fails to decode.
pub fn decode_fields(fields: Option<&Value>) -> Result<Document, String> {
    let Some(fields) = fields else {
        return Ok(Map::new());
    };
    let Value::Object(fields) = fields else {
        return Err("fields is not an object".to_string());
    };

    fields
        .iter()
        .map(|(k, v)| {
            decode_value(v)
                .map(|decoded| (k.clone(), decoded))
                .map_err(|e| format!("field {k}: {e}"))
        })
        .collect()
}
