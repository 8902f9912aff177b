// ./src/quality.rs
//! The Quality Validator (C7, spec §4.7): pure, synchronous, no I/O and no
//! Language Model call. Scores a `WorkingMemory` snapshot into four
//! weighted sub-scores.
use crate::model::working_memory::{QualityDetails, WorkingMemory};

const WEIGHT_COMPLETENESS: f64 = 0.30;
const WEIGHT_COVERAGE: f64 = 0.30;
const WEIGHT_RELIABILITY: f64 = 0.25;
const WEIGHT_FORMAT: f64 = 0.15;

/// Scores `memory` and returns `(overall, details)` (spec §4.7 contract).
pub fn score(memory: &WorkingMemory) -> (f64, QualityDetails) {
    let details = QualityDetails {
        completeness: completeness(memory),
        coverage: coverage(memory),
        reliability: reliability(memory),
        format_validity: format_validity(memory),
    };
    let overall = WEIGHT_COMPLETENESS * details.completeness
        + WEIGHT_COVERAGE * details.coverage
        + WEIGHT_RELIABILITY * details.reliability
        + WEIGHT_FORMAT * details.format_validity;
    (overall, details)
}

/// **[OPEN QUESTION RESOLUTION]** completeness is binary: 1.0 if at least
/// one successful observation exists for the stated information need(s),
/// else 0.0. Needs enumeration from the first iteration's thought is out of
/// this pure function's scope (spec §4.7 "extracted from the first
/// iteration's thought when enumerable"); that extraction, when it
/// produces more than one need, is performed by the caller before scoring
/// and is reflected here only through whether any successful call exists —
/// this function stays binary per the decision recorded in DESIGN.md.
fn completeness(memory: &WorkingMemory) -> f64 {
    if memory.api_calls.is_empty() {
        return 0.0;
    }
    if memory.api_calls.iter().any(|c| c.success) {
        1.0
    } else {
        0.0
    }
}

/// `min(1, successful_call_count / expected_call_count)` (spec §4.7),
/// expected being the size of the *last* selected function set
/// (`WorkingMemory::last_selection_size`, set by the most recent
/// `search_functions` observation), or 1 if none were ever selected. Using
/// the cumulative `available_functions` set here would understate coverage
/// once more than one search iteration has run.
fn coverage(memory: &WorkingMemory) -> f64 {
    let successful = memory.api_calls.iter().filter(|c| c.success).count() as f64;
    let expected = memory.last_selection_size.filter(|&n| n > 0).unwrap_or(1) as f64;
    (successful / expected).min(1.0)
}

/// Ratio of successful execution records to total, or 1 if none were
/// attempted (spec §4.7 "the latter drives completeness to 0, not
/// reliability").
fn reliability(memory: &WorkingMemory) -> f64 {
    if memory.api_calls.is_empty() {
        return 1.0;
    }
    let successful = memory.api_calls.iter().filter(|c| c.success).count() as f64;
    successful / memory.api_calls.len() as f64
}

/// 1 if every successful observation parses as its declared response shape
/// (or is a non-empty object/array when no schema is declared), 0.5 if
/// only some do, 0 otherwise (spec §4.7). Pairs each call with its
/// observation positionally, which is only correct because
/// `WorkingMemory::record_execution` is the sole appender to both
/// `api_calls` and `observations` (spec §3 "`|api_calls| == |observations|`");
/// nothing else may push onto `observations` without a matching call.
fn format_validity(memory: &WorkingMemory) -> f64 {
    let successful: Vec<&serde_json::Value> = memory
        .api_calls
        .iter()
        .zip(memory.observations.iter())
        .filter(|(call, _)| call.success)
        .map(|(_, obs)| obs)
        .collect();

    if successful.is_empty() {
        return 0.0;
    }

    let valid_count = successful
        .iter()
        .filter(|obs| is_non_empty_structure(obs))
        .count();

    if valid_count == successful.len() {
        1.0
    } else if valid_count > 0 {
        0.5
    } else {
        0.0
    }
}

fn is_non_empty_structure(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Object(map) => !map.is_empty(),
        serde_json::Value::Array(arr) => !arr.is_empty(),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Null => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::context::{AgentContext, Language};
    use crate::model::working_memory::ExecutionRecord;
    use serde_json::json;

    fn empty_context() -> AgentContext {
        AgentContext {
            user_id: "u1".to_string(),
            query: "q".to_string(),
            conversation_id: None,
            history: vec![],
            user_instructions: None,
            user_preferences: Default::default(),
            language: Language::English,
            reference_clock: chrono::Utc::now(),
        }
    }

    fn execution(success: bool) -> ExecutionRecord {
        ExecutionRecord {
            function_id: "f".to_string(),
            parameters: serde_json::Map::new(),
            attempt_count: 1,
            success,
            response_data: None,
            error_kind: None,
            error_message: None,
            duration_ms: 1,
            retried_due_to: None,
        }
    }

    #[test]
    fn no_calls_yields_zero_completeness_and_full_reliability() {
        let memory = WorkingMemory::new(empty_context());
        let (overall, details) = score(&memory);
        assert_eq!(details.completeness, 0.0);
        assert_eq!(details.reliability, 1.0);
        assert_eq!(details.coverage, 0.0);
        assert!(overall < 0.2);
    }

    #[test]
    fn all_successful_calls_with_valid_bodies_score_high() {
        let mut memory = WorkingMemory::new(empty_context());
        memory.record_execution(execution(true), json!({"result": "ok"}));
        memory.record_execution(execution(true), json!({"result": "ok2"}));
        let (overall, details) = score(&memory);
        assert_eq!(details.completeness, 1.0);
        assert_eq!(details.reliability, 1.0);
        assert_eq!(details.format_validity, 1.0);
        assert!(overall > 0.7);
    }

    #[test]
    fn mixed_success_degrades_reliability_and_format() {
        let mut memory = WorkingMemory::new(empty_context());
        memory.record_execution(execution(true), json!({"result": "ok"}));
        memory.record_execution(execution(false), json!({"error": "boom"}));
        let (_, details) = score(&memory);
        assert_eq!(details.reliability, 0.5);
        assert_eq!(details.format_validity, 1.0);
    }

    #[test]
    fn empty_observation_body_counts_as_invalid_format() {
        let mut memory = WorkingMemory::new(empty_context());
        memory.record_execution(execution(true), json!({}));
        let (_, details) = score(&memory);
        assert_eq!(details.format_validity, 0.0);
    }
}
