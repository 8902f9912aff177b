// ./src/constants.rs
//! Default values for the recognised configuration options (spec §6) and a
//! handful of fixed protocol strings shared across modules.

/// Key under which a `call_apis` action's serialised context is carried when
/// a synthesis strategy needs to reuse a prior observation.
pub const CTX_VARS_NAME: &str = "context_variables";

pub const ROLE_ASSISTANT: &str = "assistant";
pub const ROLE_FUNCTION: &str = "function";
pub const ROLE_SYSTEM: &str = "system";
pub const ROLE_USER: &str = "user";

/// §6 max_iterations.
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;
/// §6 quality_threshold.
pub const DEFAULT_QUALITY_THRESHOLD: f64 = 0.75;
/// §4.4 rule_threshold.
pub const DEFAULT_RULE_THRESHOLD: f64 = 0.80;
/// §4.4 semantic_threshold.
pub const DEFAULT_SEMANTIC_THRESHOLD: f64 = 0.70;
/// §4.4 top_k_retrieval.
pub const DEFAULT_TOP_K_RETRIEVAL: usize = 20;
/// §6 top_k_selected.
pub const DEFAULT_TOP_K_SELECTED: usize = 5;
/// §4.6 max_retries.
pub const DEFAULT_MAX_RETRIES: u32 = 2;
/// §4.6 per_call_timeout_ms.
pub const DEFAULT_PER_CALL_TIMEOUT_MS: u64 = 10_000;
/// §6 history_turns.
pub const DEFAULT_HISTORY_TURNS: usize = 10;
/// §6 language_default.
pub const DEFAULT_LANGUAGE: &str = "auto";

/// §4.4 "confidence is a fixed medium value (default 0.65)".
pub const DEFAULT_LLM_SELECTION_CONFIDENCE: f64 = 0.65;

/// §4.6 backoff schedule: 1s, then 3s.
pub const RETRY_BACKOFF_SCHEDULE_MS: [u64; 2] = [1_000, 3_000];

/// §4.8 THINK bounds: "at most the last 5 history turns, at most the last 3
/// iterations in full, earlier ones as summaries."
pub const THINK_HISTORY_TURN_LIMIT: usize = 5;
pub const THINK_FULL_ITERATION_LIMIT: usize = 3;

/// Vector dimension used by the in-memory fakes and the brute-force index's
/// bucket sizing heuristics. Real backends report their own dimension; this
/// is not a wire protocol constant.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 256;

/// §4.2 "Freshness... default ≤ 5s" refresh cycle for CDC-driven reconciliation.
pub const DEFAULT_INDEX_REFRESH_SECS: u64 = 5;
