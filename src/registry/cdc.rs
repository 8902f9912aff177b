// ./src/registry/cdc.rs
//! Change-data-capture events the Registry Store emits on every write (spec
//! §3, §4.1). Delivery is at-least-once over a `tokio::sync::broadcast`
//! channel; a slow subscriber can miss the *oldest* buffered events (a
//! `Lagged` error), which is why C2 also reconciles periodically via `list`
//! rather than relying on the stream alone (SPEC_FULL.md §4.1).
use crate::model::function::FunctionRecord;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ChangeOp {
    Upsert,
    Delete,
}

#[derive(Clone, Debug)]
pub struct ChangeEvent {
    pub op: ChangeOp,
    pub function_id: String,
    pub record: Option<FunctionRecord>,
}
