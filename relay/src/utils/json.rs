//! JSON utility functions

use serde_json::Value as JsonValue;

/// Serialize a JSON value with object keys sorted at every depth.
///
/// Output is compact (no whitespace). Two values that differ only in key
/// order produce identical strings, which makes the result suitable as hash
/// input regardless of the map ordering `serde_json` was built with.
pub fn canonical_json(value: &JsonValue) -> String {
    let mut out = String::new();
    write_canonical(&mut out, value);
    out
}

fn write_canonical(out: &mut String, value: &JsonValue) {
    match value {
        JsonValue::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Strings always serialize
                out.push_str(&JsonValue::String(key.clone()).to_string());
                out.push(':');
                write_canonical(out, val);
            }
            out.push('}');
        }
        JsonValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sorts_top_level_keys() {
        let value = json!({"b": 1, "a": 2});
        assert_eq!(canonical_json(&value), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn test_sorts_nested_keys() {
        let value = json!({"outer": {"z": true, "m": null}, "list": [{"y": 1, "x": 2}]});
        assert_eq!(
            canonical_json(&value),
            r#"{"list":[{"x":2,"y":1}],"outer":{"m":null,"z":true}}"#
        );
    }

    #[test]
    fn test_array_order_is_preserved() {
        let value = json!([3, 1, 2]);
        assert_eq!(canonical_json(&value), "[3,1,2]");
    }

    #[test]
    fn test_escapes_strings() {
        let value = json!({"quote\"key": "line\nbreak"});
        assert_eq!(canonical_json(&value), r#"{"quote\"key":"line\nbreak"}"#);
    }

    #[test]
    fn test_scalars() {
        assert_eq!(canonical_json(&json!(null)), "null");
        assert_eq!(canonical_json(&json!(1.5)), "1.5");
        assert_eq!(canonical_json(&json!("s")), r#""s""#);
    }
}
