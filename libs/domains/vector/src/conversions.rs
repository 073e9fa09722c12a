//! JSON <-> Qdrant payload value conversions.
//!
//! Payloads are built as `serde_json::Value` objects in the domain layer
//! and translated at the Qdrant boundary. Lists survive the round trip
//! (value propositions, key terms); nested objects are carried as structs.

use std::collections::HashMap;

use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{ListValue, Struct, Value as QdrantValue};

/// Flatten a JSON object into a Qdrant payload map. Non-object values and
/// JSON nulls produce an empty/absent field rather than an error.
pub fn json_object_to_payload(value: &serde_json::Value) -> HashMap<String, QdrantValue> {
    let mut result = HashMap::new();

    if let serde_json::Value::Object(map) = value {
        for (key, val) in map {
            if let Some(qdrant_val) = json_to_qdrant_value(val.clone()) {
                result.insert(key.clone(), qdrant_val);
            }
        }
    }

    result
}

/// Rebuild a JSON object from a Qdrant payload map.
pub fn payload_to_json_object(payload: HashMap<String, QdrantValue>) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (key, val) in payload {
        if let Some(json_val) = qdrant_value_to_json(val) {
            map.insert(key, json_val);
        }
    }
    serde_json::Value::Object(map)
}

pub fn json_to_qdrant_value(val: serde_json::Value) -> Option<QdrantValue> {
    match val {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(QdrantValue::from(b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(QdrantValue::from(i))
            } else {
                n.as_f64().map(QdrantValue::from)
            }
        }
        serde_json::Value::String(s) => Some(QdrantValue::from(s)),
        serde_json::Value::Array(items) => {
            let values: Vec<QdrantValue> =
                items.into_iter().filter_map(json_to_qdrant_value).collect();
            Some(QdrantValue {
                kind: Some(Kind::ListValue(ListValue { values })),
            })
        }
        serde_json::Value::Object(map) => {
            let fields: HashMap<String, QdrantValue> = map
                .into_iter()
                .filter_map(|(k, v)| json_to_qdrant_value(v).map(|qv| (k, qv)))
                .collect();
            Some(QdrantValue {
                kind: Some(Kind::StructValue(Struct { fields })),
            })
        }
    }
}

pub fn qdrant_value_to_json(val: QdrantValue) -> Option<serde_json::Value> {
    match val.kind {
        Some(Kind::NullValue(_)) => Some(serde_json::Value::Null),
        Some(Kind::BoolValue(b)) => Some(serde_json::Value::Bool(b)),
        Some(Kind::IntegerValue(i)) => Some(serde_json::Value::Number(i.into())),
        Some(Kind::DoubleValue(f)) => {
            serde_json::Number::from_f64(f).map(serde_json::Value::Number)
        }
        Some(Kind::StringValue(s)) => Some(serde_json::Value::String(s)),
        Some(Kind::ListValue(list)) => Some(serde_json::Value::Array(
            list.values
                .into_iter()
                .filter_map(qdrant_value_to_json)
                .collect(),
        )),
        Some(Kind::StructValue(s)) => Some(payload_to_json_object(s.fields)),
        None => None,
    }
}
