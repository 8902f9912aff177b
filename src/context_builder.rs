// ./src/context_builder.rs
//! The Context Builder (C9, spec §4.9): assembles a frozen `AgentContext`
//! from a user id and query, reading a profile and a conversation history
//! from two external, read-only collaborators.
use crate::config::UserPreferences;
use crate::constants::DEFAULT_HISTORY_TURNS;
use crate::error::FnAgentResult;
use crate::model::context::{AgentContext, HistoryTurn, Language};
use async_trait::async_trait;
use chrono::Utc;

/// Read-only profile collaborator (**[ADDED]**, spec §4.9 "the underlying
/// profile and history stores are external collaborators; the builder only
/// consumes their read interfaces" — not named as a component in spec.md's
/// table, so this trait boundary is the Rust-idiomatic way to keep the
/// concrete persistence product out of scope while still giving C9
/// something concrete to call).
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn preferences(&self, user_id: &str) -> FnAgentResult<UserPreferences>;
    async fn instructions(&self, user_id: &str) -> FnAgentResult<Option<String>>;
}

/// Read-only conversation history collaborator.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn recent_turns(&self, conversation_id: &str, limit: usize) -> FnAgentResult<Vec<HistoryTurn>>;
}

pub struct ContextBuilder<P, H> {
    profiles: P,
    history: H,
    history_turns: usize,
}

impl<P, H> ContextBuilder<P, H>
where
    P: ProfileStore,
    H: HistoryStore,
{
    pub fn new(profiles: P, history: H) -> Self {
        ContextBuilder {
            profiles,
            history,
            history_turns: DEFAULT_HISTORY_TURNS,
        }
    }

    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.history_turns = turns;
        self
    }

    pub async fn build(&self, user_id: &str, query: &str, conversation_id: Option<String>) -> FnAgentResult<AgentContext> {
        let user_preferences = self.profiles.preferences(user_id).await?;
        let user_instructions = self.profiles.instructions(user_id).await?;
        let history = match &conversation_id {
            Some(id) => self.history.recent_turns(id, self.history_turns).await?,
            None => Vec::new(),
        };
        let language = detect_language(query);

        Ok(AgentContext {
            user_id: user_id.to_string(),
            query: query.to_string(),
            conversation_id,
            history,
            user_instructions,
            user_preferences,
            language,
            reference_clock: Utc::now(),
        })
    }
}

/// Character-class heuristic (spec §4.9): a query is classified Vietnamese
/// if it contains any character from the Vietnamese-specific diacritic
/// ranges, otherwise English.
pub fn detect_language(query: &str) -> Language {
    if query.chars().any(is_vietnamese_diacritic) {
        Language::Vietnamese
    } else {
        Language::English
    }
}

fn is_vietnamese_diacritic(c: char) -> bool {
    matches!(c, 'à'..='ỹ' | 'À'..='Ỹ' | 'đ' | 'Đ')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FakeProfiles {
        preferences: UserPreferences,
        instructions: Option<String>,
    }
    #[async_trait]
    impl ProfileStore for FakeProfiles {
        async fn preferences(&self, _user_id: &str) -> FnAgentResult<UserPreferences> {
            Ok(self.preferences.clone())
        }
        async fn instructions(&self, _user_id: &str) -> FnAgentResult<Option<String>> {
            Ok(self.instructions.clone())
        }
    }

    struct FakeHistory(Mutex<Vec<HistoryTurn>>);
    #[async_trait]
    impl HistoryStore for FakeHistory {
        async fn recent_turns(&self, _conversation_id: &str, limit: usize) -> FnAgentResult<Vec<HistoryTurn>> {
            let turns = self.0.lock().unwrap();
            let start = turns.len().saturating_sub(limit);
            Ok(turns[start..].to_vec())
        }
    }

    #[tokio::test]
    async fn builds_context_with_history_and_preferences() {
        let builder = ContextBuilder::new(
            FakeProfiles {
                preferences: UserPreferences::default(),
                instructions: Some("be concise".to_string()),
            },
            FakeHistory(Mutex::new(vec![HistoryTurn {
                role: crate::model::context::Role::User,
                content: "hi".to_string(),
                function_calls: vec![],
            }])),
        );
        let context = builder
            .build("u1", "what's the weather", Some("c1".to_string()))
            .await
            .unwrap();
        assert_eq!(context.history.len(), 1);
        assert_eq!(context.user_instructions, Some("be concise".to_string()));
        assert_eq!(context.language, Language::English);
    }

    #[test]
    fn detects_vietnamese_from_diacritics() {
        assert_eq!(detect_language("tôi muốn đặt vé máy bay"), Language::Vietnamese);
        assert_eq!(detect_language("book me a flight"), Language::English);
    }

    #[tokio::test]
    async fn no_conversation_id_yields_empty_history() {
        let builder = ContextBuilder::new(
            FakeProfiles {
                preferences: UserPreferences::default(),
                instructions: None,
            },
            FakeHistory(Mutex::new(vec![])),
        );
        let context = builder.build("u1", "hello", None).await.unwrap();
        assert!(context.history.is_empty());
    }
}
