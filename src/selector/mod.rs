// ./src/selector/mod.rs
//! Function selection: the Rule-Based Selector (C3) and the Hybrid
//! Selector (C4) that dispatches across it plus the semantic and
//! LLM-reasoning tiers.
pub mod hybrid;
pub mod rule_based;

pub use hybrid::{HybridSelector, SelectionResult};
pub use rule_based::{select as select_by_rule, RuleCandidate};
