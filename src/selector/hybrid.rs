// ./src/selector/hybrid.rs
//! The Hybrid Selector (C4, spec §4.4): a three-tier dispatcher over C3,
//! C2/`Embedder`, and the `LanguageModel`.
use crate::capabilities::{Embedder, LanguageModel, ResponseFormat};
use crate::config::FnAgentConfig;
use crate::embedding_index::EmbeddingIndex;
use crate::model::context::AgentContext;
use crate::model::function::{FunctionRecord, ListFilter};
use crate::model::rule::Rule;
use crate::model::working_memory::SelectionMethod;
use crate::registry::RegistryStore;
use crate::selector::rule_based;
use serde_json::Value;
use std::sync::Arc;

/// Outcome of `select_functions` (spec §4.4 contract).
pub struct SelectionResult {
    pub functions: Vec<FunctionRecord>,
    pub method: SelectionMethod,
    pub confidence: f64,
}

pub struct HybridSelector<R, I, E, L> {
    registry: Arc<R>,
    index: Arc<I>,
    embedder: Arc<E>,
    model: Arc<L>,
    rules: Vec<Rule>,
}

impl<R, I, E, L> HybridSelector<R, I, E, L>
where
    R: RegistryStore,
    I: EmbeddingIndex,
    E: Embedder,
    L: LanguageModel,
{
    pub fn new(registry: Arc<R>, index: Arc<I>, embedder: Arc<E>, model: Arc<L>, rules: Vec<Rule>) -> Self {
        HybridSelector {
            registry,
            index,
            embedder,
            model,
            rules,
        }
    }

    /// Hydrates a list of function ids via C1, preserving order and
    /// silently dropping ids C1 no longer has (deleted/never existed).
    async fn hydrate(&self, ids: &[String]) -> Vec<FunctionRecord> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Ok(Some(record)) = self.registry.get_by_id(id).await {
                if !record.deprecated {
                    out.push(record);
                }
            }
        }
        out
    }

    pub async fn select_functions(
        &self,
        query: &str,
        context: &AgentContext,
        top_k: usize,
        config: &FnAgentConfig,
    ) -> SelectionResult {
        // Tier 1 — rule-based.
        let rule_candidates = rule_based::select(query, &self.rules);
        let rule_confidence = rule_based::overall_confidence(&rule_candidates);
        if rule_confidence >= config.rule_threshold && !rule_candidates.is_empty() {
            let ids: Vec<String> = rule_candidates.iter().take(top_k).map(|c| c.function_id.clone()).collect();
            let functions = self.hydrate(&ids).await;
            return SelectionResult {
                functions,
                method: SelectionMethod::RuleBased,
                confidence: rule_confidence,
            };
        }

        // Tier 2 — semantic.
        let semantic_shortlist = match self.embedder.embed_text(query).await {
            Ok(vector) => match self.index.search(&vector, config.top_k_retrieval, None).await {
                Ok(hits) => hits,
                Err(_) => Vec::new(),
            },
            Err(_) => Vec::new(),
        };

        if let Some(top) = semantic_shortlist.first() {
            if top.score as f64 >= config.semantic_threshold {
                let ids: Vec<String> = semantic_shortlist
                    .iter()
                    .take(top_k)
                    .map(|h| h.function_id.clone())
                    .collect();
                let confidence = top.score as f64;
                let functions = self.hydrate(&ids).await;
                return SelectionResult {
                    functions,
                    method: SelectionMethod::Semantic,
                    confidence,
                };
            }
        }

        // Tier 3 — LLM reasoning, using the semantic shortlist (possibly
        // empty) as the candidate pool, per spec §4.4.
        let shortlist_ids: Vec<String> = semantic_shortlist.iter().map(|h| h.function_id.clone()).collect();
        let prompt = self.build_selection_prompt(query, context, &semantic_shortlist, top_k);
        match self.model.complete(&prompt, None, ResponseFormat::Json).await {
            Ok(raw) => match parse_id_array(&raw) {
                Some(ids) if !ids.is_empty() => {
                    let filtered: Vec<String> = if shortlist_ids.is_empty() {
                        ids.into_iter().take(top_k).collect()
                    } else {
                        ids.into_iter()
                            .filter(|id| shortlist_ids.contains(id))
                            .take(top_k)
                            .collect()
                    };
                    let functions = self.hydrate(&filtered).await;
                    if functions.is_empty() {
                        SelectionResult {
                            functions: Vec::new(),
                            method: SelectionMethod::LlmReasoning,
                            confidence: 0.0,
                        }
                    } else {
                        SelectionResult {
                            functions,
                            method: SelectionMethod::LlmReasoning,
                            confidence: crate::constants::DEFAULT_LLM_SELECTION_CONFIDENCE,
                        }
                    }
                }
                _ => SelectionResult {
                    functions: Vec::new(),
                    method: SelectionMethod::LlmReasoning,
                    confidence: 0.0,
                },
            },
            Err(_) => self.best_available_shortlist(&semantic_shortlist, rule_confidence, &rule_candidates, top_k).await,
        }
    }

    /// Spec §4.4 failure policy: "if the Language Model fails in tier 3,
    /// the best available shortlist (semantic if present, otherwise rule)
    /// is returned with method=semantic or rule_based accordingly."
    async fn best_available_shortlist(
        &self,
        semantic_shortlist: &[crate::model::embedding::SearchHit],
        rule_confidence: f64,
        rule_candidates: &[rule_based::RuleCandidate],
        top_k: usize,
    ) -> SelectionResult {
        if !semantic_shortlist.is_empty() {
            let ids: Vec<String> = semantic_shortlist.iter().take(top_k).map(|h| h.function_id.clone()).collect();
            let confidence = semantic_shortlist[0].score as f64;
            let functions = self.hydrate(&ids).await;
            SelectionResult {
                functions,
                method: SelectionMethod::Semantic,
                confidence,
            }
        } else if !rule_candidates.is_empty() {
            let ids: Vec<String> = rule_candidates.iter().take(top_k).map(|c| c.function_id.clone()).collect();
            let functions = self.hydrate(&ids).await;
            SelectionResult {
                functions,
                method: SelectionMethod::RuleBased,
                confidence: rule_confidence,
            }
        } else {
            SelectionResult {
                functions: Vec::new(),
                method: SelectionMethod::LlmReasoning,
                confidence: 0.0,
            }
        }
    }

    fn build_selection_prompt(
        &self,
        query: &str,
        context: &AgentContext,
        shortlist: &[crate::model::embedding::SearchHit],
        top_k: usize,
    ) -> Vec<String> {
        let history: Vec<String> = context
            .history
            .iter()
            .map(|t| format!("{:?}: {}", t.role, t.content))
            .collect();
        let candidates: Vec<Value> = shortlist
            .iter()
            .take(20)
            .map(|h| {
                serde_json::json!({
                    "function_id": h.function_id,
                    "name": h.name,
                    "description": h.description,
                    "domain": h.domain.0,
                })
            })
            .collect();
        vec![
            "You select at most top_k relevant function ids for a query, \
             given candidate metadata. Reply with a JSON array of function_id \
             strings ordered by relevance, nothing else."
                .to_string(),
            format!("query: {query}"),
            format!("history: {}", history.join(" | ")),
            format!("user_instructions: {}", context.user_instructions.clone().unwrap_or_default()),
            format!("top_k: {top_k}"),
            format!("candidates: {}", Value::Array(candidates)),
        ]
    }
}

/// `ListFilter` import kept for callers that need to re-list C1 directly;
/// re-exported here so the module's public surface matches its spec role.
pub use crate::model::function::ListFilter as RegistryListFilter;

fn parse_id_array(raw: &str) -> Option<Vec<String>> {
    let value: Value = serde_json::from_str(raw.trim()).ok()?;
    let array = value.as_array()?;
    Some(
        array
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{Embedder, LanguageModel};
    use crate::embedding_index::BruteForceIndex;
    use crate::error::FnAgentResult;
    use crate::model::function::{Domain, HttpMethod};
    use crate::registry::InMemoryRegistryStore;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    struct FakeEmbedder;
    #[async_trait]
    impl Embedder for FakeEmbedder {
        async fn embed_text(&self, text: &str) -> FnAgentResult<Vec<f32>> {
            Ok(vec![if text.contains("weather") { 1.0 } else { 0.0 }, 0.0])
        }
        fn dimension(&self) -> usize {
            2
        }
    }

    struct FakeModel(String);
    #[async_trait]
    impl LanguageModel for FakeModel {
        async fn complete(&self, _p: &[String], _m: Option<u32>, _f: ResponseFormat) -> FnAgentResult<String> {
            Ok(self.0.clone())
        }
    }

    fn sample_record(id: &str) -> FunctionRecord {
        FunctionRecord {
            function_id: id.to_string(),
            name: id.to_string(),
            description: "gets the current weather".to_string(),
            domain: Domain::new("weather"),
            endpoint: "https://example.test/weather".to_string(),
            method: HttpMethod::Get,
            parameter_schema: BTreeMap::new(),
            response_schema: None,
            tags: vec![],
            popularity_score: 1.0,
            version: 1,
            deprecated: false,
        }
    }

    fn sample_context() -> AgentContext {
        AgentContext {
            user_id: "u1".to_string(),
            query: "what's the weather".to_string(),
            conversation_id: None,
            history: vec![],
            user_instructions: None,
            user_preferences: Default::default(),
            language: crate::model::context::Language::English,
            reference_clock: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn rule_tier_wins_when_confident() {
        let registry = Arc::new(InMemoryRegistryStore::new());
        registry.upsert(sample_record("weather.today"));
        let index = Arc::new(BruteForceIndex::new(2));
        let selector = HybridSelector::new(
            registry,
            index,
            Arc::new(FakeEmbedder),
            Arc::new(FakeModel("[]".to_string())),
            vec![Rule::keywords(["weather"], ["weather.today"], 0.9)],
        );
        let config = FnAgentConfig::default();
        let result = selector
            .select_functions("what's the weather", &sample_context(), 5, &config)
            .await;
        assert_eq!(result.method, SelectionMethod::RuleBased);
        assert_eq!(result.functions.len(), 1);
    }

    #[tokio::test]
    async fn falls_through_to_semantic_tier() {
        let registry = Arc::new(InMemoryRegistryStore::new());
        registry.upsert(sample_record("weather.today"));
        let index = Arc::new(BruteForceIndex::new(2));
        index
            .upsert(
                "weather.today",
                vec![1.0, 0.0],
                crate::embedding_index::EmbeddingMetadata {
                    name: "weather.today".to_string(),
                    description: "gets the current weather".to_string(),
                    domain: Domain::new("weather"),
                    popularity_score: 1.0,
                },
            )
            .await
            .unwrap();
        let selector = HybridSelector::new(
            registry,
            index,
            Arc::new(FakeEmbedder),
            Arc::new(FakeModel("[]".to_string())),
            vec![],
        );
        let config = FnAgentConfig::default();
        let result = selector
            .select_functions("what's the weather", &sample_context(), 5, &config)
            .await;
        assert_eq!(result.method, SelectionMethod::Semantic);
        assert_eq!(result.functions.len(), 1);
    }

    #[tokio::test]
    async fn no_tier_fires_returns_empty_zero_confidence() {
        let registry = Arc::new(InMemoryRegistryStore::new());
        let index = Arc::new(BruteForceIndex::new(2));
        let selector = HybridSelector::new(
            registry,
            index,
            Arc::new(FakeEmbedder),
            Arc::new(FakeModel("[]".to_string())),
            vec![],
        );
        let config = FnAgentConfig::default();
        let result = selector
            .select_functions("unrelated query text", &sample_context(), 5, &config)
            .await;
        assert!(result.functions.is_empty());
        assert_eq!(result.confidence, 0.0);
    }
}
