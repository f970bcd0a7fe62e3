//! Case conversion between the STA wire names and internal field names.
//!
//! Wire properties are camelCase (`phenomenonTime`), relation and entity names are PascalCase
//! (`FeatureOfInterest`), internal entity fields and relation keys are snake_case.

use serde_json::{Map, Value};

/// Convert a single identifier from snake_case to camelCase.
/// e.g. "phenomenon_time" -> "phenomenonTime", "result" -> "result"
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut capitalize_next = false;
    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Convert a single identifier from camelCase or PascalCase to snake_case.
/// e.g. "resultTime" -> "result_time", "FeatureOfInterest" -> "feature_of_interest"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Wire keys that carry an annotation (`@iot.id`) or a path (`FeatureOfInterest/id`) are kept as-is.
fn is_annotated(key: &str) -> bool {
    key.contains('@') || key.contains('/')
}

/// Convert the top-level keys of a request body from camelCase to snake_case (in place).
/// Nested values (`properties`, `unitOfMeasurement`) are user data and are left untouched.
pub fn object_keys_to_snake_case(obj: &mut Map<String, Value>) {
    let keys: Vec<String> = obj.keys().cloned().collect();
    for k in keys {
        if is_annotated(&k) {
            continue;
        }
        let snake = to_snake_case(&k);
        if snake != k {
            if let Some(v) = obj.remove(&k) {
                obj.insert(snake, v);
            }
        }
    }
}
