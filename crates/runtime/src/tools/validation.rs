//! Structural validation of tool arguments against a [`ToolSchema`].

use regex::Regex;
use serde_json::Value;

use super::types::{ParamSchema, ParamType, ToolSchema, ValidationError};

/// Validate `args` against `schema`. Returns the list of violations found
/// (possibly from multiple fields) rather than failing fast, so callers can
/// surface everything wrong with a single replan.
pub fn validate(schema: &ToolSchema, args: &Value) -> Result<(), ValidationError> {
    let mut violations = Vec::new();

    let Value::Object(map) = args else {
        return Err(ValidationError {
            violations: vec!["arguments must be a JSON object".to_string()],
        });
    };

    for required in &schema.required {
        if !map.contains_key(required) {
            violations.push(format!("missing required field '{required}'"));
        }
    }

    for (key, value) in map {
        match schema.fields.get(key) {
            Some(field_schema) => {
                if let Err(reason) = validate_field(field_schema, value) {
                    violations.push(format!("field '{key}': {reason}"));
                }
            }
            None => {
                if !schema.additional_properties {
                    violations.push(format!("unexpected field '{key}'"));
                }
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { violations })
    }
}

fn validate_field(schema: &ParamSchema, value: &Value) -> Result<(), String> {
    let type_ok = match schema.param_type {
        ParamType::String => value.is_string(),
        ParamType::Integer => value.is_i64() || value.is_u64(),
        ParamType::Number => value.is_number(),
        ParamType::Boolean => value.is_boolean(),
        ParamType::Array => value.is_array(),
        ParamType::Object => value.is_object(),
    };
    if !type_ok {
        return Err(format!("expected type {:?}, got {value}", schema.param_type));
    }

    if !schema.enum_values.is_empty() && !schema.enum_values.contains(value) {
        return Err(format!("value {value} is not one of the declared enum values"));
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = schema.minimum {
            if n < min {
                return Err(format!("value {n} is below minimum {min}"));
            }
        }
        if let Some(max) = schema.maximum {
            if n > max {
                return Err(format!("value {n} is above maximum {max}"));
            }
        }
    }

    if let (Some(pattern), Some(s)) = (&schema.pattern, value.as_str()) {
        let re = Regex::new(pattern).map_err(|e| format!("invalid pattern '{pattern}': {e}"))?;
        if !re.is_match(s) {
            return Err(format!("value '{s}' does not match pattern '{pattern}'"));
        }
    }

    if schema.param_type == ParamType::Array {
        if let Some(items) = value.as_array() {
            if let Some(first) = items.first() {
                let tag = std::mem::discriminant(first);
                if items.iter().any(|v| std::mem::discriminant(v) != tag) {
                    return Err("array elements are not homogeneous".to_string());
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn schema() -> ToolSchema {
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), ParamSchema::new(ParamType::String));
        let mut count = ParamSchema::new(ParamType::Integer);
        count.minimum = Some(0.0);
        count.maximum = Some(10.0);
        fields.insert("count".to_string(), count);
        ToolSchema {
            fields,
            required: vec!["name".to_string()],
            additional_properties: false,
        }
    }

    #[test]
    fn accepts_valid_args() {
        assert!(validate(&schema(), &json!({"name": "x", "count": 3})).is_ok());
    }

    #[test]
    fn rejects_missing_required() {
        let err = validate(&schema(), &json!({"count": 3})).unwrap_err();
        assert!(err.violations.iter().any(|v| v.contains("name")));
    }

    #[test]
    fn rejects_wrong_type() {
        let err = validate(&schema(), &json!({"name": 5})).unwrap_err();
        assert!(err.violations.iter().any(|v| v.contains("name")));
    }

    #[test]
    fn rejects_out_of_bounds() {
        let err = validate(&schema(), &json!({"name": "x", "count": 100})).unwrap_err();
        assert!(err.violations.iter().any(|v| v.contains("count")));
    }

    #[test]
    fn rejects_unknown_field_unless_allowed() {
        let err = validate(&schema(), &json!({"name": "x", "extra": true})).unwrap_err();
        assert!(err.violations.iter().any(|v| v.contains("extra")));
    }

    #[test]
    fn allows_unknown_field_when_additional_properties() {
        let mut s = schema();
        s.additional_properties = true;
        assert!(validate(&s, &json!({"name": "x", "extra": true})).is_ok());
    }

    #[test]
    fn rejects_non_object_args() {
        assert!(validate(&schema(), &json!([1, 2])).is_err());
    }
}
