// ./src/retry.rs
//! The Retry Executor (C6, spec §4.6): looks up a Function Record, builds
//! and sends its HTTP request, classifies the outcome, and retries
//! retryable failures on a fixed backoff schedule.
use crate::constants::RETRY_BACKOFF_SCHEDULE_MS;
use crate::error::Retryability;
use crate::model::function::{FunctionRecord, HttpMethod};
use crate::model::working_memory::{ErrorKind, ExecutionRecord};
use crate::registry::RegistryStore;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Kinds of network-level failure `classify` distinguishes from an HTTP
/// status (spec §4.6 "Network-level errors: connection refused, DNS,
/// timeout → retryable").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkErrorKind {
    ConnectionRefused,
    Dns,
    Timeout,
    Other,
}

/// Pure classification function (spec §9 "a single pure function on
/// (http_status, exception_kind)"), unit-testable without a network (spec
/// §8 invariant).
pub fn classify(status: Option<u16>, network_err: Option<&NetworkErrorKind>) -> Retryability {
    if network_err.is_some() {
        return Retryability::Retryable;
    }
    match status {
        Some(s) if (200..300).contains(&s) => Retryability::NonRetryable,
        Some(408) | Some(425) | Some(429) => Retryability::Retryable,
        Some(s) if (500..600).contains(&s) => Retryability::Retryable,
        Some(_) => Retryability::NonRetryable,
        None => Retryability::NonRetryable,
    }
}

fn error_kind_for(status: Option<u16>, network_err: Option<&NetworkErrorKind>) -> ErrorKind {
    if network_err.is_some() {
        return match network_err {
            Some(NetworkErrorKind::Timeout) => ErrorKind::Timeout,
            _ => ErrorKind::Network,
        };
    }
    match status {
        Some(401) | Some(403) => ErrorKind::Auth,
        Some(404) => ErrorKind::NotFound,
        Some(400) | Some(422) => ErrorKind::BadRequest,
        Some(408) => ErrorKind::Timeout,
        Some(s) if (500..600).contains(&s) || s == 429 || s == 425 => ErrorKind::ServerError,
        _ => ErrorKind::ServerError,
    }
}

#[derive(Clone)]
pub struct RetryExecutor<R> {
    registry: Arc<R>,
    client: reqwest::Client,
    max_retries: u32,
    per_call_timeout: Duration,
}

impl<R> RetryExecutor<R>
where
    R: RegistryStore,
{
    pub fn new(registry: Arc<R>, max_retries: u32, per_call_timeout: Duration) -> Self {
        RetryExecutor {
            registry,
            client: reqwest::Client::new(),
            max_retries,
            per_call_timeout,
        }
    }

    pub async fn execute(&self, function_id: &str, parameters: &Map<String, Value>) -> ExecutionRecord {
        let started = Instant::now();

        let record = match self.registry.get_by_id(function_id).await {
            Ok(Some(record)) if !record.deprecated => record,
            _ => {
                return ExecutionRecord {
                    function_id: function_id.to_string(),
                    parameters: parameters.clone(),
                    attempt_count: 0,
                    success: false,
                    response_data: None,
                    error_kind: Some(ErrorKind::NotFound),
                    error_message: Some(format!("function '{function_id}' not found or deprecated")),
                    duration_ms: started.elapsed().as_millis() as u64,
                    retried_due_to: None,
                };
            }
        };

        let mut attempt_count = 0u32;
        let mut retried_due_to = None;

        loop {
            attempt_count += 1;
            let outcome = self.attempt_once(&record, parameters).await;

            match outcome {
                Ok(body) => {
                    return ExecutionRecord {
                        function_id: function_id.to_string(),
                        parameters: parameters.clone(),
                        attempt_count,
                        success: true,
                        response_data: Some(body),
                        error_kind: None,
                        error_message: None,
                        duration_ms: started.elapsed().as_millis() as u64,
                        retried_due_to,
                    };
                }
                Err((status, network_err, message)) => {
                    let retryability = classify(status, network_err.as_ref());
                    let kind = error_kind_for(status, network_err.as_ref());

                    let retries_exhausted = attempt_count > self.max_retries;
                    if retryability == Retryability::NonRetryable || retries_exhausted {
                        return ExecutionRecord {
                            function_id: function_id.to_string(),
                            parameters: parameters.clone(),
                            attempt_count,
                            success: false,
                            response_data: None,
                            error_kind: Some(kind),
                            error_message: Some(message),
                            duration_ms: started.elapsed().as_millis() as u64,
                            retried_due_to,
                        };
                    }

                    retried_due_to = Some(kind);
                    let delay_idx = (attempt_count as usize - 1).min(RETRY_BACKOFF_SCHEDULE_MS.len() - 1);
                    tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_SCHEDULE_MS[delay_idx])).await;
                }
            }
        }
    }

    /// Sends one request and returns either the parsed response body or a
    /// `(status, network_error_kind, message)` triple describing the
    /// failure, letting `execute` classify without re-deriving status codes
    /// from `reqwest::Error` in two places.
    async fn attempt_once(
        &self,
        record: &FunctionRecord,
        parameters: &Map<String, Value>,
    ) -> Result<Value, (Option<u16>, Option<NetworkErrorKind>, String)> {
        let mut builder = match record.method {
            HttpMethod::Get => {
                let mut url = match reqwest::Url::parse(&record.endpoint) {
                    Ok(u) => u,
                    Err(e) => return Err((None, Some(NetworkErrorKind::Other), format!("invalid endpoint url: {e}"))),
                };
                {
                    let mut pairs = url.query_pairs_mut();
                    for (k, v) in parameters {
                        pairs.append_pair(k, &value_to_query_string(v));
                    }
                }
                self.client.get(url)
            }
            HttpMethod::Post => self.client.post(&record.endpoint).json(&Value::Object(parameters.clone())),
            HttpMethod::Put => self.client.put(&record.endpoint).json(&Value::Object(parameters.clone())),
            HttpMethod::Delete => self.client.delete(&record.endpoint).json(&Value::Object(parameters.clone())),
        };
        builder = builder.timeout(self.per_call_timeout);

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();

        if !(200..300).contains(&status) {
            let body_text = response.text().await.unwrap_or_default();
            return Err((Some(status), None, format!("HTTP {status}: {body_text}")));
        }

        let text = response.text().await.map_err(map_reqwest_error)?;
        match serde_json::from_str::<Value>(&text) {
            Ok(v) => Ok(v),
            Err(_) => Ok(Value::String(text)),
        }
    }
}

fn value_to_query_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn map_reqwest_error(e: reqwest::Error) -> (Option<u16>, Option<NetworkErrorKind>, String) {
    let status = e.status().map(|s| s.as_u16());
    let kind = if e.is_timeout() {
        NetworkErrorKind::Timeout
    } else if e.is_connect() {
        NetworkErrorKind::ConnectionRefused
    } else {
        NetworkErrorKind::Other
    };
    (status, Some(kind), e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_status_is_non_retryable() {
        assert_eq!(classify(Some(200), None), Retryability::NonRetryable);
    }

    #[test]
    fn server_error_is_retryable() {
        assert_eq!(classify(Some(500), None), Retryability::Retryable);
        assert_eq!(classify(Some(503), None), Retryability::Retryable);
    }

    #[test]
    fn rate_limit_and_timeout_statuses_are_retryable() {
        assert_eq!(classify(Some(429), None), Retryability::Retryable);
        assert_eq!(classify(Some(408), None), Retryability::Retryable);
    }

    #[test]
    fn other_4xx_is_non_retryable() {
        assert_eq!(classify(Some(400), None), Retryability::NonRetryable);
        assert_eq!(classify(Some(404), None), Retryability::NonRetryable);
    }

    #[test]
    fn network_errors_are_always_retryable() {
        assert_eq!(classify(None, Some(&NetworkErrorKind::ConnectionRefused)), Retryability::Retryable);
        assert_eq!(classify(None, Some(&NetworkErrorKind::Dns)), Retryability::Retryable);
        assert_eq!(classify(None, Some(&NetworkErrorKind::Timeout)), Retryability::Retryable);
    }

    #[test]
    fn error_kind_maps_auth_and_not_found() {
        assert_eq!(error_kind_for(Some(401), None), ErrorKind::Auth);
        assert_eq!(error_kind_for(Some(404), None), ErrorKind::NotFound);
        assert_eq!(error_kind_for(Some(400), None), ErrorKind::BadRequest);
    }

    use crate::model::function::{Domain, HttpMethod as Method};
    use crate::registry::InMemoryRegistryStore;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_function(endpoint: String) -> FunctionRecord {
        FunctionRecord {
            function_id: "get_weather".to_string(),
            name: "get_weather".to_string(),
            description: "fetches current weather".to_string(),
            domain: Domain::new("weather"),
            endpoint,
            method: Method::Get,
            parameter_schema: Default::default(),
            response_schema: None,
            tags: vec![],
            popularity_score: 1.0,
            version: 1,
            deprecated: false,
        }
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"temp_c": 21})))
            .expect(1)
            .mount(&server)
            .await;

        let registry = Arc::new(InMemoryRegistryStore::new());
        registry.upsert(sample_function(format!("{}/weather", server.uri())));
        let executor = RetryExecutor::new(registry, 2, Duration::from_secs(5));

        let record = executor.execute("get_weather", &Map::new()).await;
        assert!(record.success);
        assert_eq!(record.attempt_count, 3);
        assert_eq!(record.response_data, Some(serde_json::json!({"temp_c": 21})));
    }

    #[tokio::test]
    async fn bad_request_fails_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let registry = Arc::new(InMemoryRegistryStore::new());
        registry.upsert(sample_function(format!("{}/weather", server.uri())));
        let executor = RetryExecutor::new(registry, 2, Duration::from_secs(5));

        let record = executor.execute("get_weather", &Map::new()).await;
        assert!(!record.success);
        assert_eq!(record.attempt_count, 1);
        assert_eq!(record.error_kind, Some(ErrorKind::BadRequest));
    }

    #[tokio::test]
    async fn unknown_function_fails_fast_without_a_call() {
        let registry = Arc::new(InMemoryRegistryStore::new());
        let executor = RetryExecutor::new(registry, 2, Duration::from_secs(5));

        let record = executor.execute("does_not_exist", &Map::new()).await;
        assert!(!record.success);
        assert_eq!(record.attempt_count, 0);
        assert_eq!(record.error_kind, Some(ErrorKind::NotFound));
    }
}
