// ./src/model/working_memory.rs
//! Working Memory (spec §3) — the per-run mutable record the ReAct Loop
//! owns exclusively and appends to as it iterates.
use super::context::AgentContext;
use super::function::FunctionRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tagged variant recorded on each iteration (spec §9 "Polymorphic selector
/// tiers... represented as a tagged variant").
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SelectionMethod {
    RuleBased,
    Semantic,
    LlmReasoning,
}

/// Tagged variant recorded on each synthesis attempt (spec §9 "Parameter
/// strategies as tagged variants").
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SynthesisStrategy {
    Template,
    Extraction,
    ContextReuse,
    Llm,
}

/// The fixed closed set of ACT-phase actions (spec §4.8).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActionType {
    SearchFunctions,
    CallApis,
    Analyse,
    Done,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Action {
    pub action_type: ActionType,
    pub input: serde_json::Value,
}

/// The REFLECT-phase decision (spec §3).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Done,
}

/// One full THINK/ACT/OBSERVE/REFLECT pass (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Iteration {
    pub index: u32,
    pub thought: String,
    pub action: Action,
    pub observation: serde_json::Value,
    pub reflection: String,
    pub quality_score_at_iteration: f64,
    pub decision: Decision,
    pub selection_method: Option<SelectionMethod>,
    pub selection_confidence: Option<f64>,
    pub synthesis_strategy: Option<SynthesisStrategy>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Retry-classified error kind recorded on a failed `ExecutionRecord`
/// (spec §4.6).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    NotFound,
    BadRequest,
    Timeout,
    Network,
    ServerError,
}

/// One function call's full execution trace (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub function_id: String,
    pub parameters: serde_json::Map<String, serde_json::Value>,
    pub attempt_count: u32,
    pub success: bool,
    pub response_data: Option<serde_json::Value>,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub duration_ms: u64,
    pub retried_due_to: Option<ErrorKind>,
}

/// Run status (spec §3). Transitions are monotonic: `running` →
/// `completed`|`incomplete`|`failed`, never backwards — enforced by
/// `WorkingMemory::finish` being the only way to leave `Running`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Status {
    Running,
    Completed,
    Incomplete,
    Failed,
}

/// The four sub-scores the Quality Validator (C7) produces.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct QualityDetails {
    pub completeness: f64,
    pub coverage: f64,
    pub reliability: f64,
    pub format_validity: f64,
}

/// Per-strategy/per-selector counters kept for observability (spec §4.5
/// "Strategy metrics... accumulated on Working Memory").
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StrategyCounters {
    pub selection_counts: HashMap<String, u32>,
    pub synthesis_counts: HashMap<String, u32>,
}

impl StrategyCounters {
    pub fn record_selection(&mut self, method: SelectionMethod) {
        *self.selection_counts.entry(format!("{method:?}")).or_insert(0) += 1;
    }

    pub fn record_synthesis(&mut self, strategy: SynthesisStrategy) {
        *self.synthesis_counts.entry(format!("{strategy:?}")).or_insert(0) += 1;
    }
}

/// The per-run mutable record (spec §3). Owned exclusively by the run that
/// created it; every mutating method here is the only way other components
/// append to it, which is how the "single owning run, append-only" note in
/// SPEC_FULL.md §3 is enforced by the type rather than by convention.
#[derive(Clone, Debug)]
pub struct WorkingMemory {
    pub context: AgentContext,
    pub iterations: Vec<Iteration>,
    pub available_functions: Vec<FunctionRecord>,
    pub api_calls: Vec<ExecutionRecord>,
    pub observations: Vec<serde_json::Value>,
    pub insights: Vec<String>,
    pub final_answer: Option<String>,
    pub status: Status,
    pub quality_score: f64,
    pub quality_details: QualityDetails,
    pub total_execution_time_ms: u64,
    pub strategy_counters: StrategyCounters,
    /// Size of the most recent `search_functions` selection, used by C7's
    /// coverage sub-score as "the size of the last selected function set"
    /// (spec §4.7). `None` until a selection has happened.
    pub last_selection_size: Option<usize>,
}

impl WorkingMemory {
    pub fn new(context: AgentContext) -> Self {
        WorkingMemory {
            context,
            iterations: Vec::new(),
            available_functions: Vec::new(),
            api_calls: Vec::new(),
            observations: Vec::new(),
            insights: Vec::new(),
            final_answer: None,
            status: Status::Running,
            quality_score: 0.0,
            quality_details: QualityDetails::default(),
            total_execution_time_ms: 0,
            strategy_counters: StrategyCounters::default(),
            last_selection_size: None,
        }
    }

    pub fn record_iteration(&mut self, iteration: Iteration) {
        self.iterations.push(iteration);
    }

    /// Appends a function's available candidates, deduplicated by
    /// `function_id` (spec §3 "deduplicated by function_id").
    pub fn merge_available_functions(&mut self, functions: impl IntoIterator<Item = FunctionRecord>) {
        for function in functions {
            if !self
                .available_functions
                .iter()
                .any(|f| f.function_id == function.function_id)
            {
                self.available_functions.push(function);
            }
        }
    }

    /// Appends a call and its observation together, preserving the
    /// `|api_calls| == |observations|` invariant (spec §8) at every
    /// observable moment.
    pub fn record_execution(&mut self, record: ExecutionRecord, observation: serde_json::Value) {
        self.api_calls.push(record);
        self.observations.push(observation);
    }

    /// Records the size of the just-returned `search_functions` selection
    /// (spec §4.7 "the size of the last selected function set").
    pub fn record_selection_size(&mut self, size: usize) {
        self.last_selection_size = Some(size);
    }

    pub fn push_insight(&mut self, insight: impl Into<String>) {
        self.insights.push(insight.into());
    }

    /// Transitions `Running` → one of the terminal statuses. A no-op if
    /// already terminal, so `finish` can be called defensively from an
    /// error-handling path without double-transitioning.
    pub fn finish(&mut self, status: Status, final_answer: String) {
        if self.status == Status::Running {
            self.status = status;
            self.final_answer = Some(final_answer);
        }
    }

    pub fn last_iteration_index(&self) -> u32 {
        self.iterations.last().map(|it| it.index).unwrap_or(0)
    }
}
