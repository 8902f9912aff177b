// ./src/synthesizer/validate.rs
//! JSON Schema validation shared by every synthesis strategy (spec §4.5
//! "Validation: after any strategy, every required parameter must be
//! present, every value must match its declared type").
use serde_json::Value;

/// Validates `instance` against `schema`, returning the first error message
/// on failure. Used after each strategy attempt so a strategy that produces
/// a plausible-looking but invalid argument map falls through to the next
/// one instead of being accepted.
pub fn validate(schema: &Value, instance: &Value) -> Result<(), String> {
    let validator = jsonschema::validator_for(schema).map_err(|e| format!("invalid parameter schema: {e}"))?;
    if let Some(first) = validator.iter_errors(instance).next() {
        return Err(first.to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_missing_required_field() {
        let schema = json!({
            "type": "object",
            "properties": { "origin": { "type": "string" } },
            "required": ["origin"],
        });
        assert!(validate(&schema, &json!({})).is_err());
    }

    #[test]
    fn accepts_matching_instance() {
        let schema = json!({
            "type": "object",
            "properties": { "origin": { "type": "string" } },
            "required": ["origin"],
        });
        assert!(validate(&schema, &json!({"origin": "SGN"})).is_ok());
    }

    #[test]
    fn rejects_wrong_type() {
        let schema = json!({
            "type": "object",
            "properties": { "count": { "type": "integer" } },
            "required": ["count"],
        });
        assert!(validate(&schema, &json!({"count": "three"})).is_err());
    }
}
