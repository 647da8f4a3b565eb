//! Conversion between JSON and packable values.
//!
//! Integers that fit in 64 bits stay integers; anything with a fraction or
//! exponent becomes a single precision float. Binary content has no JSON
//! form and prints as an uppercase hex string. Object keys keep their
//! order in both directions.

use bigpacks::{PackResult, Value};
use serde_json::{Map, Number, Value as Json};

/// Convert parsed JSON into a packable value.
pub fn json_to_value(json: &Json) -> PackResult<Value> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => number_to_value(n)?,
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(items) => Value::List(
            items
                .iter()
                .map(json_to_value)
                .collect::<PackResult<Vec<_>>>()?,
        ),
        Json::Object(entries) => Value::Map(
            entries
                .iter()
                .map(|(k, v)| Ok((Value::Text(k.clone()), json_to_value(v)?)))
                .collect::<PackResult<Vec<_>>>()?,
        ),
    })
}

fn number_to_value(n: &Number) -> PackResult<Value> {
    if let Some(v) = n.as_i64() {
        return Ok(Value::Integer(v));
    }
    if let Some(v) = n.as_u64() {
        return Value::try_from(v);
    }
    Ok(Value::Float32(n.as_f64().unwrap_or(f64::NAN) as f32))
}

/// Convert a value into JSON for display.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(v) => Json::from(*v),
        // NaN and infinities have no JSON form.
        Value::Float32(v) => float_to_json(*v as f64),
        Value::Float64(v) => float_to_json(*v),
        Value::Text(s) => Json::String(s.clone()),
        Value::Bytes(b) => Json::String(hex::encode_upper(b)),
        Value::List(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Map(entries) => {
            let mut object = Map::new();
            for (k, v) in entries {
                object.insert(key_to_string(k), value_to_json(v));
            }
            Json::Object(object)
        }
    }
}

/// Copy of `json` with the keys of every object sorted.
pub fn sort_keys(json: &Json) -> Json {
    match json {
        Json::Array(items) => Json::Array(items.iter().map(sort_keys).collect()),
        Json::Object(object) => {
            let mut entries: Vec<(&String, &Json)> = object.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Json::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_keys(v)))
                    .collect(),
            )
        }
        other => other.clone(),
    }
}

fn float_to_json(v: f64) -> Json {
    Number::from_f64(v).map(Json::Number).unwrap_or(Json::Null)
}

/// Render a map key or index entry as plain text.
pub fn key_to_string(key: &Value) -> String {
    match key {
        Value::Text(s) => s.clone(),
        Value::Bytes(b) => hex::encode_upper(b),
        other => other.to_string(),
    }
}
