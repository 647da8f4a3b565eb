//! Command-line resource and content arguments.

use bigpacks::Value;
use serde_json::Value as Json;
use std::fs;
use std::path::Path;

use crate::error::{CliError, CliResult};
use crate::json::json_to_value;

/// Turn `config/wifi/0` into the path `["config", "wifi", 0]`.
///
/// Empty segments are dropped, so `""` and `/` both name the root.
pub fn parse_resource(resource: &str) -> Value {
    Value::List(
        resource
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(parse_segment)
            .collect(),
    )
}

fn parse_segment(segment: &str) -> Value {
    if segment.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(index) = segment.parse::<i64>() {
            return Value::Integer(index);
        }
    }
    Value::from(segment)
}

/// Read request content: inline JSON when it looks like an array or
/// object, otherwise the path of a JSON file.
pub fn load_content(content: &str) -> CliResult<Value> {
    let text = if content.starts_with('[') || content.starts_with('{') {
        content.to_owned()
    } else {
        let path = Path::new(content);
        fs::read_to_string(path).map_err(|source| CliError::ContentFile {
            path: path.to_path_buf(),
            source,
        })?
    };
    let json: Json = serde_json::from_str(&text)?;
    Ok(json_to_value(&json)?)
}
