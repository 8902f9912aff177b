// ./src/model/mod.rs
//! The data model of spec §3: Function Record, Embedding Record, Rule,
//! Template, Agent Context, Working Memory.
pub mod context;
pub mod embedding;
pub mod function;
pub mod rule;
pub mod template;
pub mod working_memory;

pub use context::{AgentContext, HistoryTurn, Language, Role};
pub use embedding::{EmbeddingRecord, SearchHit};
pub use function::{Domain, FunctionRecord, HttpMethod, ListFilter, ParameterSpec, ParameterType};
pub use rule::{Pattern, Rule};
pub use template::{Template, TemplateValue};
pub use working_memory::{
    Action, ActionType, Decision, ErrorKind, ExecutionRecord, Iteration, QualityDetails,
    SelectionMethod, Status, StrategyCounters, SynthesisStrategy, WorkingMemory,
};
