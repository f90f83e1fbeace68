//! Row content hashing.

use serde_json::Value;
use sha2::{Digest, Sha256};
use tablemerge_client::RowValues;

/// Compact JSON with object keys sorted at every depth. Independent of
/// serde_json's map ordering features.
pub fn canonical_json(values: &RowValues) -> String {
    let mut out = String::new();
    out.push('{');
    for (i, (key, value)) in values.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(&mut out, key);
        out.push(':');
        write_value(&mut out, value);
    }
    out.push('}');
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, v);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, v) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, v);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push_str(&Value::String(s.to_string()).to_string());
}

/// Hex SHA-256 of [`canonical_json`].
pub fn content_hash(values: &RowValues) -> String {
    format!("{:x}", Sha256::digest(canonical_json(values).as_bytes()))
}
