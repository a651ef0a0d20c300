use std::fs::File;
use std::io::{self, Write};

use serde_json::Value;

pub fn write_strings_2_file(content: &str, file_name: &str) -> io::Result<()> {
    File::create(file_name)?.write_all(content.as_bytes())
}

/// Loose truthiness: null, false, 0, "" and empty containers are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Strings are shown without their quotes, everything else as compact JSON.
pub fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
