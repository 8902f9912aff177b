// ./src/model/context.rs
//! Agent Context (spec §3, §4.9) — the frozen input the ReAct Loop, Hybrid
//! Selector and Parameter Synthesizer all read from.
use crate::config::UserPreferences;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    Function,
    System,
}

/// One prior turn of the conversation (spec §3 "history... each with role
/// and content and prior function calls").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub function_calls: Vec<String>,
}

/// Detected query language (spec §4.9 "Vietnamese vs English via
/// character-class heuristic").
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Language {
    Vietnamese,
    English,
}

impl Language {
    pub fn iso_tag(&self) -> &'static str {
        match self {
            Language::Vietnamese => "vi",
            Language::English => "en",
        }
    }
}

/// A frozen snapshot built by the Context Builder (C9) and consumed
/// read-only by C4/C5/C8.
#[derive(Clone, Debug)]
pub struct AgentContext {
    pub user_id: String,
    pub query: String,
    pub conversation_id: Option<String>,
    pub history: Vec<HistoryTurn>,
    pub user_instructions: Option<String>,
    pub user_preferences: UserPreferences,
    pub language: Language,
    /// Reference clock for relative-date extraction in C5 (spec §9 "must
    /// take a reference_clock from context"), not named as an Agent Context
    /// field in spec §3 but required by §4.5/§9 — threaded through here so
    /// the synthesiser never calls `Utc::now()` itself (keeps it pure and
    /// deterministically testable).
    pub reference_clock: DateTime<Utc>,
}

impl AgentContext {
    /// The last `history_turns` entries, most-recent-last (spec §4.9).
    pub fn recent_history(&self, history_turns: usize) -> &[HistoryTurn] {
        let len = self.history.len();
        let start = len.saturating_sub(history_turns);
        &self.history[start..]
    }
}
