// ./src/config.rs
/// Configuration for the fnagent runtime.
///
/// Holds every threshold the Hybrid Selector, Parameter Synthesizer, Retry
/// Executor and ReAct Loop consult as a single, overridable value instead of
/// a scattered constant.
use crate::constants::*;
use crate::error::{FnAgentError, FnAgentResult};
use std::time::Duration;

/// Closed set of user preference keys consumed by prompts (spec §6).
/// Unrecognised keys are ignored by `UserPreferences::from_map`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserPreferences {
    pub data_granularity: Option<DataGranularity>,
    pub preferred_visualisation: Option<PreferredVisualisation>,
    pub time_range_default: Option<TimeRangeDefault>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataGranularity {
    Summary,
    Detailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreferredVisualisation {
    Table,
    Chart,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeRangeDefault {
    Today,
    ThisWeek,
    ThisMonth,
    Last30Days,
}

impl UserPreferences {
    /// Builds preferences from a loosely-typed map, silently dropping any
    /// key or value outside the closed set spec §6 recognises.
    pub fn from_map(map: &std::collections::HashMap<String, String>) -> Self {
        let data_granularity = map.get("data_granularity").and_then(|v| match v.as_str() {
            "summary" => Some(DataGranularity::Summary),
            "detailed" => Some(DataGranularity::Detailed),
            _ => None,
        });
        let preferred_visualisation = map.get("preferred_visualisation").and_then(|v| match v.as_str() {
            "table" => Some(PreferredVisualisation::Table),
            "chart" => Some(PreferredVisualisation::Chart),
            "none" => Some(PreferredVisualisation::None),
            _ => None,
        });
        let time_range_default = map.get("time_range_default").and_then(|v| match v.as_str() {
            "today" => Some(TimeRangeDefault::Today),
            "this_week" => Some(TimeRangeDefault::ThisWeek),
            "this_month" => Some(TimeRangeDefault::ThisMonth),
            "last_30_days" => Some(TimeRangeDefault::Last30Days),
            _ => None,
        });
        UserPreferences {
            data_granularity,
            preferred_visualisation,
            time_range_default,
        }
    }
}

/// Runtime configuration for an `AgentLoop`, `HybridSelector`,
/// `ParameterSynthesizer` and `RetryExecutor`. Every field is one of the
/// "Recognised configuration options" from spec §6.
#[derive(Clone, Debug)]
pub struct FnAgentConfig {
    /// §6 max_iterations.
    pub max_iterations: u32,
    /// §6 quality_threshold.
    pub quality_threshold: f64,
    /// §4.4 rule_threshold.
    pub rule_threshold: f64,
    /// §4.4 semantic_threshold.
    pub semantic_threshold: f64,
    /// §4.4 top_k_retrieval.
    pub top_k_retrieval: usize,
    /// §6 top_k_selected.
    pub top_k_selected: usize,
    /// §4.6 max_retries.
    pub max_retries: u32,
    /// §4.6 per_call_timeout_ms.
    pub per_call_timeout: Duration,
    /// §6 history_turns.
    pub history_turns: usize,
    /// §6 language_default ("auto" means detect from the query).
    pub language_default: String,
}

impl Default for FnAgentConfig {
    fn default() -> Self {
        FnAgentConfig {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            rule_threshold: DEFAULT_RULE_THRESHOLD,
            semantic_threshold: DEFAULT_SEMANTIC_THRESHOLD,
            top_k_retrieval: DEFAULT_TOP_K_RETRIEVAL,
            top_k_selected: DEFAULT_TOP_K_SELECTED,
            max_retries: DEFAULT_MAX_RETRIES,
            per_call_timeout: Duration::from_millis(DEFAULT_PER_CALL_TIMEOUT_MS),
            history_turns: DEFAULT_HISTORY_TURNS,
            language_default: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl FnAgentConfig {
    pub fn builder() -> FnAgentConfigBuilder {
        FnAgentConfigBuilder::new()
    }

    /// Validates that every threshold and bound is within the range spec §6
    /// declares (e.g. "float in [0,1]", "integer ≥ 1").
    pub fn validate(&self) -> FnAgentResult<()> {
        if self.max_iterations < 1 {
            return Err(FnAgentError::ValidationError(
                "max_iterations must be >= 1".to_string(),
            ));
        }
        for (name, value) in [
            ("quality_threshold", self.quality_threshold),
            ("rule_threshold", self.rule_threshold),
            ("semantic_threshold", self.semantic_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(FnAgentError::ValidationError(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if self.top_k_retrieval < 1 {
            return Err(FnAgentError::ValidationError(
                "top_k_retrieval must be >= 1".to_string(),
            ));
        }
        if self.top_k_selected < 1 {
            return Err(FnAgentError::ValidationError(
                "top_k_selected must be >= 1".to_string(),
            ));
        }
        if self.per_call_timeout.is_zero() {
            return Err(FnAgentError::ValidationError(
                "per_call_timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for `FnAgentConfig`.
pub struct FnAgentConfigBuilder {
    config: FnAgentConfig,
}

impl FnAgentConfigBuilder {
    pub fn new() -> Self {
        FnAgentConfigBuilder {
            config: FnAgentConfig::default(),
        }
    }

    pub fn max_iterations(mut self, v: u32) -> Self {
        self.config.max_iterations = v;
        self
    }
    pub fn quality_threshold(mut self, v: f64) -> Self {
        self.config.quality_threshold = v;
        self
    }
    pub fn rule_threshold(mut self, v: f64) -> Self {
        self.config.rule_threshold = v;
        self
    }
    pub fn semantic_threshold(mut self, v: f64) -> Self {
        self.config.semantic_threshold = v;
        self
    }
    pub fn top_k_retrieval(mut self, v: usize) -> Self {
        self.config.top_k_retrieval = v;
        self
    }
    pub fn top_k_selected(mut self, v: usize) -> Self {
        self.config.top_k_selected = v;
        self
    }
    pub fn max_retries(mut self, v: u32) -> Self {
        self.config.max_retries = v;
        self
    }
    pub fn per_call_timeout(mut self, v: Duration) -> Self {
        self.config.per_call_timeout = v;
        self
    }
    pub fn history_turns(mut self, v: usize) -> Self {
        self.config.history_turns = v;
        self
    }
    pub fn language_default(mut self, v: impl Into<String>) -> Self {
        self.config.language_default = v.into();
        self
    }

    pub fn build(self) -> FnAgentResult<FnAgentConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for FnAgentConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
