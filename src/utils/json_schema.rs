use serde_json::Value;

/// Validates `value` against a JSON schema subset: `type` (string or list), `enum`,
/// `const`, `properties`, `required`, `additionalProperties: false` and `items`.
/// Returns the first violation as a path-qualified message.
pub fn validate(schema: &Value, value: &Value) -> Result<(), String> {
    validate_at(schema, value, "$")
}

fn validate_at(schema: &Value, value: &Value, path: &str) -> Result<(), String> {
    let schema = match schema {
        Value::Bool(true) | Value::Null => return Ok(()),
        Value::Bool(false) => return Err(format!("{path}: no value is allowed here")),
        Value::Object(obj) => obj,
        _ => return Ok(()),
    };

    if let Some(expected) = schema.get("type") {
        let allowed: Vec<&str> = match expected {
            Value::String(name) => vec![name.as_str()],
            Value::Array(names) => names.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        if !allowed.is_empty() && !allowed.iter().any(|name| type_matches(name, value)) {
            return Err(format!(
                "{path}: expected {}, got {}",
                allowed.join(" | "),
                type_name(value)
            ));
        }
    }

    if let Some(options) = schema.get("enum").and_then(Value::as_array) {
        if !options.contains(value) {
            return Err(format!("{path}: value {value} is not one of the allowed values"));
        }
    }

    if let Some(expected) = schema.get("const") {
        if expected != value {
            return Err(format!("{path}: expected constant {expected}"));
        }
    }

    if let Value::Object(fields) = value {
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for key in required.iter().filter_map(Value::as_str) {
                if !fields.contains_key(key) {
                    return Err(format!("{path}: missing required property {key:?}"));
                }
            }
        }

        let properties = schema.get("properties").and_then(Value::as_object);
        let closed = matches!(schema.get("additionalProperties"), Some(Value::Bool(false)));
        for (key, field) in fields {
            match properties.and_then(|props| props.get(key)) {
                Some(sub) => validate_at(sub, field, &format!("{path}.{key}"))?,
                None if closed => {
                    return Err(format!("{path}: unexpected property {key:?}"));
                }
                None => {}
            }
        }
    }

    if let (Value::Array(items), Some(item_schema)) = (value, schema.get("items")) {
        for (idx, item) in items.iter().enumerate() {
            validate_at(item_schema, item, &format!("{path}[{idx}]"))?;
        }
    }

    Ok(())
}

fn type_matches(name: &str, value: &Value) -> bool {
    match name {
        "null" => value.is_null(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "age": { "type": "integer" },
                "tags": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["name"]
        })
    }

    #[test]
    fn accepts_matching_object() {
        assert_eq!(
            validate(&person_schema(), &json!({ "name": "World", "age": 3, "tags": ["a"] })),
            Ok(())
        );
    }

    #[test]
    fn reports_missing_required_property() {
        let err = validate(&person_schema(), &json!({ "age": 3 })).expect_err("missing name");
        assert!(err.contains("missing required property \"name\""), "{err}");
    }

    #[test]
    fn reports_nested_type_mismatch_with_path() {
        let err = validate(&person_schema(), &json!({ "name": "x", "tags": ["a", 1] }))
            .expect_err("bad tag");
        assert_eq!(err, "$.tags[1]: expected string, got number");
    }

    #[test]
    fn closed_objects_reject_unknown_properties() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "additionalProperties": false
        });
        let err = validate(&schema, &json!({ "name": "x", "extra": true })).expect_err("closed");
        assert!(err.contains("unexpected property \"extra\""), "{err}");
    }

    #[test]
    fn type_lists_and_enums() {
        let schema = json!({ "type": ["string", "null"], "enum": ["a", null] });
        assert_eq!(validate(&schema, &json!(null)), Ok(()));
        assert_eq!(validate(&schema, &json!("a")), Ok(()));
        assert!(validate(&schema, &json!("b")).is_err());
        assert!(validate(&schema, &json!(1)).is_err());
    }
}
