// ./src/synthesizer/mod.rs
//! The Parameter Synthesizer (C5, spec §4.5): four strategies tried in
//! order, each validated against the function's `parameter_schema` before
//! being accepted.
pub mod aliases;
pub mod context_reuse;
pub mod extraction;
pub mod llm;
pub mod validate;

use crate::capabilities::LanguageModel;
use crate::model::context::AgentContext;
use crate::model::function::FunctionRecord;
use crate::model::working_memory::{ExecutionRecord, SynthesisStrategy};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Outcome of `synthesise` (spec §4.5 contract).
pub struct SynthesisAttempt {
    pub strategy: SynthesisStrategy,
    pub ok: bool,
    pub parameters: Map<String, Value>,
    pub error: Option<String>,
}

pub struct ParameterSynthesizer<L> {
    model: Arc<L>,
    templates: Vec<crate::model::template::Template>,
}

impl<L> ParameterSynthesizer<L>
where
    L: LanguageModel,
{
    pub fn new(model: Arc<L>, templates: Vec<crate::model::template::Template>) -> Self {
        ParameterSynthesizer { model, templates }
    }

    pub async fn synthesise(
        &self,
        function: &FunctionRecord,
        query: &str,
        context: &AgentContext,
        previous_results: &[ExecutionRecord],
    ) -> SynthesisAttempt {
        let schema = function.to_json_schema();

        // Tier 1: template.
        for template in &self.templates {
            if let Some(candidate) = template.try_match(query) {
                let map: Map<String, Value> = candidate.into_iter().collect();
                let instance = Value::Object(map.clone());
                if validate::validate(&schema, &instance).is_ok() {
                    return SynthesisAttempt {
                        strategy: SynthesisStrategy::Template,
                        ok: true,
                        parameters: map,
                        error: None,
                    };
                }
            }
        }

        // Tier 2: extraction.
        let mut extracted: Map<String, Value> = Map::new();
        for (name, spec) in &function.parameter_schema {
            if let Some(value) = extraction::extract_parameter(name, spec, query, context.reference_clock) {
                extracted.insert(name.clone(), value);
            }
        }
        let instance = Value::Object(extracted.clone());
        if validate::validate(&schema, &instance).is_ok() {
            return SynthesisAttempt {
                strategy: SynthesisStrategy::Extraction,
                ok: true,
                parameters: extracted,
                error: None,
            };
        }

        // Tier 3: context reuse, filling gaps left by extraction.
        let mut reused = extracted.clone();
        for (name, spec) in &function.parameter_schema {
            if reused.contains_key(name) {
                continue;
            }
            if let Some(value) = context_reuse::reuse_from_history(&function.function_id, name, previous_results) {
                reused.insert(name.clone(), value);
            } else if let Some(default) = &spec.default {
                reused.insert(name.clone(), default.clone());
            }
        }
        let instance = Value::Object(reused.clone());
        if validate::validate(&schema, &instance).is_ok() {
            return SynthesisAttempt {
                strategy: SynthesisStrategy::ContextReuse,
                ok: true,
                parameters: reused,
                error: None,
            };
        }

        // Tier 4: LLM generation, last resort.
        match llm::synthesise_via_llm(self.model.as_ref(), function, query).await {
            Ok(Value::Object(map)) => {
                let instance = Value::Object(map.clone());
                match validate::validate(&schema, &instance) {
                    Ok(()) => SynthesisAttempt {
                        strategy: SynthesisStrategy::Llm,
                        ok: true,
                        parameters: map,
                        error: None,
                    },
                    Err(e) => SynthesisAttempt {
                        strategy: SynthesisStrategy::Llm,
                        ok: false,
                        parameters: map,
                        error: Some(e),
                    },
                }
            }
            Ok(_) => SynthesisAttempt {
                strategy: SynthesisStrategy::Llm,
                ok: false,
                parameters: Map::new(),
                error: Some("Language Model reply was not a JSON object".to_string()),
            },
            Err(e) => SynthesisAttempt {
                strategy: SynthesisStrategy::Llm,
                ok: false,
                parameters: Map::new(),
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::ResponseFormat;
    use crate::error::FnAgentResult;
    use crate::model::function::{Domain, HttpMethod, ParameterSpec, ParameterType};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::BTreeMap;

    struct FakeModel(String);
    #[async_trait]
    impl LanguageModel for FakeModel {
        async fn complete(&self, _p: &[String], _m: Option<u32>, _f: ResponseFormat) -> FnAgentResult<String> {
            Ok(self.0.clone())
        }
    }

    fn function_with_origin() -> FunctionRecord {
        let mut schema = BTreeMap::new();
        schema.insert(
            "origin".to_string(),
            ParameterSpec {
                param_type: ParameterType::String,
                required: true,
                enum_values: None,
                default: None,
                description: None,
            },
        );
        FunctionRecord {
            function_id: "flights.search".to_string(),
            name: "flights.search".to_string(),
            description: "searches flights".to_string(),
            domain: Domain::new("travel"),
            endpoint: "https://example.test/flights".to_string(),
            method: HttpMethod::Get,
            parameter_schema: schema,
            response_schema: None,
            tags: vec![],
            popularity_score: 1.0,
            version: 1,
            deprecated: false,
        }
    }

    fn context() -> AgentContext {
        AgentContext {
            user_id: "u1".to_string(),
            query: "flights from SGN".to_string(),
            conversation_id: None,
            history: vec![],
            user_instructions: None,
            user_preferences: Default::default(),
            language: crate::model::context::Language::English,
            reference_clock: Utc::now(),
        }
    }

    #[tokio::test]
    async fn falls_through_to_context_reuse_then_succeeds() {
        let synthesizer = ParameterSynthesizer::new(Arc::new(FakeModel("{}".to_string())), vec![]);
        let function = function_with_origin();
        let previous = vec![crate::model::working_memory::ExecutionRecord {
            function_id: "flights.search".to_string(),
            parameters: serde_json::json!({"origin": "SGN"}).as_object().cloned().unwrap(),
            attempt_count: 1,
            success: true,
            response_data: None,
            error_kind: None,
            error_message: None,
            duration_ms: 5,
            retried_due_to: None,
        }];
        let attempt = synthesizer
            .synthesise(&function, "book a flight please", &context(), &previous)
            .await;
        assert!(attempt.ok);
        assert_eq!(attempt.strategy, SynthesisStrategy::ContextReuse);
        assert_eq!(attempt.parameters.get("origin"), Some(&Value::String("SGN".to_string())));
    }

    #[tokio::test]
    async fn last_resort_llm_tier_produces_parameters() {
        let synthesizer = ParameterSynthesizer::new(
            Arc::new(FakeModel(r#"{"origin": "HAN"}"#.to_string())),
            vec![],
        );
        let function = function_with_origin();
        let attempt = synthesizer
            .synthesise(&function, "book something", &context(), &[])
            .await;
        assert!(attempt.ok);
        assert_eq!(attempt.strategy, SynthesisStrategy::Llm);
    }

    #[tokio::test]
    async fn all_strategies_failing_reports_llm_as_last_tried() {
        let synthesizer = ParameterSynthesizer::new(Arc::new(FakeModel("not json".to_string())), vec![]);
        let function = function_with_origin();
        let attempt = synthesizer
            .synthesise(&function, "book something", &context(), &[])
            .await;
        assert!(!attempt.ok);
        assert_eq!(attempt.strategy, SynthesisStrategy::Llm);
        assert!(attempt.error.is_some());
    }
}
