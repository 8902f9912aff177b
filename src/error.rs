/// Error types for the fnagent library
///
/// This module provides the error taxonomy from spec §7: configuration
/// errors (fatal at startup), transient upstream errors (retried locally),
/// validation errors (the offending action fails but the run continues),
/// execution errors (recorded on an `ExecutionRecord`), and reasoning errors
/// (unparseable model output, handled as a no-op by the caller).
use thiserror::Error;

/// Main error type for the fnagent library.
///
/// No error from an individual iteration of the ReAct loop ever escapes
/// `AgentLoop::run` (spec §7 "no error from an individual iteration aborts
/// the run; only failing to start (configuration) aborts"). This type exists
/// so every component underneath the loop has somewhere to put what went
/// wrong, and so the loop can classify it via `is_retriable()` /
/// `is_configuration_error()`.
///
/// # Examples
///
/// ```rust
/// use fnagent::FnAgentError;
///
/// let error = FnAgentError::ApiError("Rate limit exceeded".to_string());
/// assert_eq!(error.to_string(), "API error: Rate limit exceeded");
///
/// assert!(FnAgentError::NetworkError("Connection refused".to_string()).is_retriable());
/// ```
#[derive(Error, Debug)]
pub enum FnAgentError {
    /// Errors returned by the Language Model or Embedder capability.
    #[error("API error: {0}")]
    ApiError(String),

    /// A required capability (Registry, Embedding Index, Language Model) is
    /// absent or misconfigured at construction time — fatal, per spec §7.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Errors related to agent execution.
    #[error("Agent error: {0}")]
    AgentError(String),

    /// Input validation errors, including parameter-schema validation
    /// failures (C5) that are not retried within the synthesiser itself.
    #[error("Invalid input: {0}")]
    ValidationError(String),

    /// Rate limiting errors from an external capability. Classified as
    /// retryable by C6 (spec §5 "treats rate-limit errors as retryable").
    #[error("Rate limit exceeded: {0}")]
    RateLimitError(String),

    /// Network communication errors: connection refused, DNS, reset.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Timeout errors from any suspension point in spec §5.
    #[error("Timeout error: {0}")]
    TimeoutError(String),

    /// Authentication and authorization errors.
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// HTTP client errors from reqwest.
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// Environment variable errors.
    #[error(transparent)]
    EnvVarError(#[from] std::env::VarError),

    /// Data serialization errors.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Data deserialization errors, including the unparseable-JSON
    /// "reasoning error" case in spec §7.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// A function referenced by an id is not present in the Registry Store,
    /// or is present but deprecated (spec §4.6 "fail fast with
    /// error_kind=not_found").
    #[error("Function not found: {0}")]
    FunctionNotFoundError(String),

    /// Function execution errors (C6, non-retryable outcome).
    #[error("Function execution error: {0}")]
    FunctionError(String),

    /// Stream processing errors (C10).
    #[error("Stream processing error: {0}")]
    StreamError(String),

    /// Context variables or Agent Context assembly errors (C9).
    #[error("Context error: {0}")]
    ContextError(String),

    /// Maximum iterations exceeded. Not actually an error path in the loop
    /// (spec §4.8 "exceeding it is not an error but forces DONE") — kept for
    /// components that want to surface it as a hard failure (e.g. a caller
    /// enforcing a stricter budget than `max_iterations`).
    #[error("Maximum iterations exceeded: {0}")]
    MaxIterationsError(String),

    /// JSON processing errors.
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// Parameter-schema validation errors from `jsonschema`.
    #[error("Schema validation error: {0}")]
    SchemaError(String),

    /// Generic/catch-all errors.
    #[error("Other error: {0}")]
    Other(String),

    /// Request timeout errors with duration, in seconds.
    #[error("Request timed out after {0} seconds")]
    RequestTimeoutError(u64),

    /// URL validation errors.
    #[error("URL validation error: {0}")]
    UrlValidationError(String),
}

/// Type alias for Results using FnAgentError.
pub type FnAgentResult<T> = Result<T, FnAgentError>;

/// The classification outcome spec §4.6 asks for as "a single pure function
/// on (http_status, exception_kind)" — see [`crate::retry::classify`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Retryability {
    Retryable,
    NonRetryable,
}

impl FnAgentError {
    /// Returns true for errors that might succeed on retry: network errors,
    /// timeouts, and rate limits (spec §7 "Transient upstream error").
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fnagent::FnAgentError;
    ///
    /// let error = FnAgentError::NetworkError("Connection reset".to_string());
    /// assert!(error.is_retriable());
    ///
    /// let error = FnAgentError::ValidationError("Invalid input".to_string());
    /// assert!(!error.is_retriable());
    /// ```
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            FnAgentError::NetworkError(_) | FnAgentError::TimeoutError(_) | FnAgentError::RateLimitError(_)
        )
    }

    /// Returns true for errors that indicate the run cannot start at all
    /// (spec §7 "Configuration error... fatal, the run cannot begin").
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            FnAgentError::ConfigError(_) | FnAgentError::AuthError(_) | FnAgentError::EnvVarError(_)
        )
    }
}

impl From<anyhow::Error> for FnAgentError {
    fn from(err: anyhow::Error) -> Self {
        FnAgentError::Other(err.to_string())
    }
}

impl From<std::io::Error> for FnAgentError {
    fn from(err: std::io::Error) -> Self {
        FnAgentError::Other(err.to_string())
    }
}
