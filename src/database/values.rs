//! Conversions between request data (strings, JSON) and sea-query values.

use sea_orm::{
    DatabaseBackend,
    sea_query::{Keyword, SimpleExpr, Value},
};
use uuid::Uuid;

/// Convert a raw parameter into a typed value.
///
/// Integers, floats and booleans are recognised; UUIDs are bound natively on
/// Postgres and as text elsewhere; anything else stays a string.
#[must_use]
pub fn param_to_value(raw: &str, backend: DatabaseBackend) -> Value {
    let trimmed = raw.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::BigInt(Some(int));
    }
    if let Ok(float) = trimmed.parse::<f64>()
        && float.is_finite()
    {
        return Value::Double(Some(float));
    }
    match trimmed {
        "true" => return Value::Bool(Some(true)),
        "false" => return Value::Bool(Some(false)),
        _ => {}
    }
    string_value(trimmed, backend)
}

/// Bind a string, using the native UUID type on Postgres when it parses as one
#[must_use]
pub fn string_value(s: &str, backend: DatabaseBackend) -> Value {
    if backend == DatabaseBackend::Postgres
        && let Ok(uuid) = Uuid::parse_str(s)
    {
        return Value::Uuid(Some(Box::new(uuid)));
    }
    Value::String(Some(Box::new(s.to_string())))
}

/// Convert a JSON payload value into an expression usable in INSERT/UPDATE.
///
/// `null` becomes the `NULL` keyword so no parameter type is forced on the
/// column; arrays and objects are stored as JSON.
#[must_use]
pub fn json_to_expr(value: &serde_json::Value, backend: DatabaseBackend) -> SimpleExpr {
    match value {
        serde_json::Value::Null => SimpleExpr::Keyword(Keyword::Null),
        other => json_to_value(other, backend).into(),
    }
}

/// Convert a non-null JSON scalar into a bound value
#[must_use]
pub fn json_to_value(value: &serde_json::Value, backend: DatabaseBackend) -> Value {
    match value {
        serde_json::Value::Null => Value::String(None),
        serde_json::Value::Bool(b) => Value::Bool(Some(*b)),
        serde_json::Value::Number(n) => {
            // Integers past i64 bind as doubles
            n.as_i64()
                .map_or_else(|| Value::Double(n.as_f64()), |int| Value::BigInt(Some(int)))
        }
        serde_json::Value::String(s) => string_value(s, backend),
        composite @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
            Value::Json(Some(Box::new(composite.clone())))
        }
    }
}

/// Stable key for matching JSON values across queries (e.g. `7` and `"7"`)
#[must_use]
pub fn value_key(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
