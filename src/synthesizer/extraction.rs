// ./src/synthesizer/extraction.rs
//! Tier 2: per-type extractors (spec §4.5 "Extraction"). Each extractor
//! looks at the raw query text and a parameter's declared type/enum and
//! tries to pull out a single unambiguous value; it never consults
//! `previous_results` (that's tier 3, context reuse).
use crate::model::function::{ParameterSpec, ParameterType};
use crate::synthesizer::aliases;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;

/// Tries to extract a value for one parameter from `query`. Returns `None`
/// when nothing in the query looks like a plausible value for this
/// parameter — the caller falls through to context reuse or the LLM tier.
pub fn extract_parameter(name: &str, spec: &ParameterSpec, query: &str, reference_clock: DateTime<Utc>) -> Option<Value> {
    if let Some(values) = &spec.enum_values {
        return extract_enum(query, values);
    }
    match spec.param_type {
        ParameterType::String => extract_string_by_hint(name, query, reference_clock),
        ParameterType::Integer | ParameterType::Number => extract_number(query, spec.param_type),
        ParameterType::Boolean => extract_boolean(query),
        ParameterType::Array | ParameterType::Object => None,
    }
}

/// Enum parameters match by alias dictionary (spec §4.5): every declared
/// enum value is tried case/diacritic-insensitively against the query, plus
/// the region alias table for the common "region" shape.
fn extract_enum(query: &str, values: &[Value]) -> Option<Value> {
    let folded_query = crate::util::fold_diacritics(query);
    for v in values {
        if let Some(s) = v.as_str() {
            if folded_query.contains(&crate::util::fold_diacritics(s)) {
                return Some(v.clone());
            }
        }
    }
    if let Some(region) = aliases::resolve_region(query) {
        if values.iter().any(|v| v.as_str() == Some(region)) {
            return Some(Value::String(region.to_string()));
        }
    }
    None
}

/// Dates resolve relative phrases to a concrete ISO date (spec §4.5). When
/// the phrase resolves to a range, the start date is returned for a single
/// `date`-shaped string parameter; range-shaped parameters are expected to
/// be modelled as two separate fields by the registry, which this extractor
/// doesn't invent on the caller's behalf.
fn extract_string_by_hint(name: &str, query: &str, reference_clock: DateTime<Utc>) -> Option<Value> {
    let lower_name = name.to_lowercase();
    if lower_name.contains("date") || lower_name.contains("ngay") {
        if let Some((start, _end)) = aliases::resolve_relative_date(query, reference_clock) {
            return Some(Value::String(start));
        }
    }
    if lower_name.contains("region") || lower_name.contains("mien") {
        if let Some(region) = aliases::resolve_region(query) {
            return Some(Value::String(region.to_string()));
        }
    }
    None
}

/// Numbers extract the first unambiguous numeric token with an optional
/// unit suffix (spec §4.5), e.g. "2 adults" -> 2, "3.5kg" -> 3.5.
fn extract_number(query: &str, param_type: ParameterType) -> Option<Value> {
    let re = Regex::new(r"-?\d+(?:\.\d+)?").ok()?;
    let raw = re.find(query)?.as_str();
    match param_type {
        ParameterType::Integer => raw.parse::<i64>().ok().map(Value::from),
        ParameterType::Number => raw.parse::<f64>().ok().and_then(|f| serde_json::Number::from_f64(f)).map(Value::Number),
        _ => None,
    }
}

fn extract_boolean(query: &str) -> Option<Value> {
    let folded = crate::util::fold_diacritics(query);
    const TRUE_WORDS: &[&str] = &["yes", "co", "true", "dong y"];
    const FALSE_WORDS: &[&str] = &["no", "khong", "false"];
    if TRUE_WORDS.iter().any(|w| folded.contains(w)) {
        return Some(Value::Bool(true));
    }
    if FALSE_WORDS.iter().any(|w| folded.contains(w)) {
        return Some(Value::Bool(false));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap()
    }

    #[test]
    fn extracts_enum_by_alias() {
        let spec = ParameterSpec {
            param_type: ParameterType::String,
            required: true,
            enum_values: Some(vec![Value::String("North".into()), Value::String("South".into())]),
            default: None,
            description: None,
        };
        let result = extract_parameter("region", &spec, "weather in miền Bắc please", clock());
        assert_eq!(result, Some(Value::String("North".to_string())));
    }

    #[test]
    fn extracts_relative_date_for_date_named_parameter() {
        let spec = ParameterSpec {
            param_type: ParameterType::String,
            required: true,
            enum_values: None,
            default: None,
            description: None,
        };
        let result = extract_parameter("date", &spec, "weather today", clock());
        assert_eq!(result, Some(Value::String("2026-07-28".to_string())));
    }

    #[test]
    fn extracts_integer_token() {
        let spec = ParameterSpec {
            param_type: ParameterType::Integer,
            required: true,
            enum_values: None,
            default: None,
            description: None,
        };
        let result = extract_parameter("passenger_count", &spec, "book for 3 adults", clock());
        assert_eq!(result, Some(Value::from(3)));
    }

    #[test]
    fn returns_none_when_nothing_matches() {
        let spec = ParameterSpec {
            param_type: ParameterType::Integer,
            required: true,
            enum_values: None,
            default: None,
            description: None,
        };
        assert_eq!(extract_parameter("count", &spec, "no numbers here", clock()), None);
    }
}
