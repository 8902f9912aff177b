// ./src/synthesizer/context_reuse.rs
//! Tier 3: context reuse (spec §4.5). Fills parameters still missing after
//! extraction from prior `ExecutionRecord`s, either a previous call to the
//! same function or one whose response declared a matching field.
use crate::model::working_memory::ExecutionRecord;
use serde_json::Value;

/// Looks for a value for `parameter_name` among `previous_results`,
/// preferring a prior call to `function_id` itself, then falling back to
/// any successful call whose response has a same-named field.
pub fn reuse_from_history(function_id: &str, parameter_name: &str, previous_results: &[ExecutionRecord]) -> Option<Value> {
    for record in previous_results.iter().rev() {
        if record.function_id == function_id && record.success {
            if let Some(v) = record.parameters.get(parameter_name) {
                return Some(v.clone());
            }
            if let Some(v) = field_from_response(record, parameter_name) {
                return Some(v);
            }
        }
    }
    for record in previous_results.iter().rev() {
        if record.success {
            if let Some(v) = field_from_response(record, parameter_name) {
                return Some(v);
            }
        }
    }
    None
}

fn field_from_response(record: &ExecutionRecord, field: &str) -> Option<Value> {
    record.response_data.as_ref()?.as_object()?.get(field).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::working_memory::ExecutionRecord;
    use serde_json::json;

    fn successful_record(function_id: &str, params: Value, response: Value) -> ExecutionRecord {
        ExecutionRecord {
            function_id: function_id.to_string(),
            parameters: params.as_object().cloned().unwrap_or_default(),
            attempt_count: 1,
            success: true,
            response_data: Some(response),
            error_kind: None,
            error_message: None,
            duration_ms: 10,
            retried_due_to: None,
        }
    }

    #[test]
    fn reuses_parameter_from_same_function_call() {
        let history = vec![successful_record(
            "flights.search",
            json!({"origin": "SGN"}),
            json!({"trip_id": "abc"}),
        )];
        let value = reuse_from_history("flights.search", "origin", &history);
        assert_eq!(value, Some(Value::String("SGN".to_string())));
    }

    #[test]
    fn reuses_field_from_a_different_functions_response() {
        let history = vec![successful_record("flights.search", json!({}), json!({"trip_id": "abc"}))];
        let value = reuse_from_history("flights.book", "trip_id", &history);
        assert_eq!(value, Some(Value::String("abc".to_string())));
    }

    #[test]
    fn ignores_failed_calls() {
        let mut record = successful_record("flights.search", json!({"origin": "SGN"}), json!({}));
        record.success = false;
        let value = reuse_from_history("flights.search", "origin", &[record]);
        assert_eq!(value, None);
    }
}
