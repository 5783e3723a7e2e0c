//! # Field Values
//!
//! Calculator inputs and outputs are plain JSON values keyed by field id.
//! Form inputs usually arrive as text, so numeric interpretation accepts
//! both JSON numbers and numeric strings.
//!
//! ## Example
//!
//! ```rust
//! use qa_core::values::{as_number, is_blank, FieldMap};
//! use serde_json::json;
//!
//! let mut inputs = FieldMap::new();
//! inputs.insert("rate".to_string(), json!("6.5"));
//! inputs.insert("term".to_string(), json!(30));
//!
//! assert_eq!(as_number(&inputs["rate"]), Some(6.5));
//! assert!(is_blank(inputs.get("missing")));
//! ```

use std::collections::BTreeMap;

use serde_json::Value;

/// Ordered map of field id to value (inputs or outputs).
pub type FieldMap = BTreeMap<String, Value>;

/// Interpret a value as a finite number.
///
/// Numbers pass through; strings are trimmed and parsed. Booleans, nulls,
/// arrays and objects are not numeric.
pub fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// True when the value is absent, null or an empty (whitespace-only) string.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Numeric lookup of a field in a map.
pub fn number_field(map: &FieldMap, field: &str) -> Option<f64> {
    map.get(field).and_then(as_number)
}

/// Build a [`FieldMap`] from `(field, value)` pairs.
pub fn field_map<K, V, I>(pairs: I) -> FieldMap
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// Short human-readable rendering for reports and logs.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
