//! Normalizers for Dataverse response values.
//!
//! The API returns data in all sorts of formats, so these functions can be
//! used to pre-process known problematic data points before deserializing.
//! Most common case is the separation of non-existing values vs. explicit
//! `null` returned by the API. All functions are total and never panic.

use serde_json::Value;

/// Normalize a response value to an integer. Missing or unusable → 0.
pub fn as_int(value: &Value) -> i64 {
  match value {
    Value::Null => 0,
    Value::Bool(b) => *b as i64,
    Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
    Value::String(s) => {
      let s = s.trim();
      s.parse::<i64>()
        .or_else(|_| s.replace(',', ".").parse::<f64>().map(|f| f as i64))
        .unwrap_or(0)
    }
    _ => 0,
  }
}

/// Normalize a response value to a float. Accepts decimal-comma strings.
pub fn as_float(value: &Value) -> f64 {
  match value {
    Value::Null => 0.0,
    Value::Bool(b) => *b as i64 as f64,
    Value::Number(n) => n.as_f64().unwrap_or(0.0),
    Value::String(s) => s.trim().replace(',', ".").parse::<f64>().unwrap_or(0.0),
    _ => 0.0,
  }
}

/// Normalize a response value to a string. Missing → empty string.
pub fn as_str(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

/// Normalize a response value to a bool. Only JSON `true` is true.
pub fn as_bool(value: &Value) -> bool {
  matches!(value, Value::Bool(true))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_as_int() {
    assert_eq!(as_int(&json!(null)), 0);
    assert_eq!(as_int(&json!(42)), 42);
    assert_eq!(as_int(&json!(42.9)), 42);
    assert_eq!(as_int(&json!("42")), 42);
    assert_eq!(as_int(&json!("42,5")), 42);
    assert_eq!(as_int(&json!("")), 0);
    assert_eq!(as_int(&json!("abc")), 0);
    assert_eq!(as_int(&json!(true)), 1);
    assert_eq!(as_int(&json!([1, 2])), 0);
  }

  #[test]
  fn test_as_float() {
    assert_eq!(as_float(&json!(null)), 0.0);
    assert_eq!(as_float(&json!(1.5)), 1.5);
    assert_eq!(as_float(&json!("1.5")), 1.5);
    assert_eq!(as_float(&json!("1,5")), 1.5);
    assert_eq!(as_float(&json!("")), 0.0);
    assert_eq!(as_float(&json!(false)), 0.0);
  }

  #[test]
  fn test_as_str() {
    assert_eq!(as_str(&json!(null)), "");
    assert_eq!(as_str(&json!("foo")), "foo");
    assert_eq!(as_str(&json!(12)), "12");
    assert_eq!(as_str(&json!(true)), "true");
  }

  #[test]
  fn test_as_bool() {
    assert!(as_bool(&json!(true)));
    assert!(!as_bool(&json!(false)));
    assert!(!as_bool(&json!(null)));
    assert!(!as_bool(&json!("true")));
    assert!(!as_bool(&json!(1)));
  }
}
