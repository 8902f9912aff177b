// src/main.rs
//! Runs a single fnagent query end to end against a small, in-process
//! function registry, using deterministic stand-ins for the Language Model
//! and Embedder capabilities instead of a real provider SDK — enough to
//! watch the THINK/ACT/OBSERVE/REFLECT loop actually turn.
use anyhow::{Context, Result};
use async_trait::async_trait;
use fnagent::agent_loop::AgentLoop;
use fnagent::capabilities::{Embedder, LanguageModel, ResponseFormat};
use fnagent::config::FnAgentConfig;
use fnagent::embedding_index::{BruteForceIndex, EmbeddingIndex, EmbeddingMetadata};
use fnagent::error::FnAgentResult;
use fnagent::model::function::{Domain, FunctionRecord, HttpMethod};
use fnagent::model::rule::Rule;
use fnagent::registry::InMemoryRegistryStore;
use fnagent::{AgentContext, WorkingMemory};
use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;

const EMBEDDING_DIMENSION: usize = 16;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let query = env::var("FNAGENT_DEMO_QUERY").unwrap_or_else(|_| "what's the weather in Hanoi today?".to_string());
    let user_id = env::var("FNAGENT_DEMO_USER").unwrap_or_else(|_| "demo-user".to_string());

    let registry = Arc::new(InMemoryRegistryStore::new());
    registry.upsert(weather_function());
    registry.upsert(stock_price_function());

    let index = Arc::new(BruteForceIndex::new(EMBEDDING_DIMENSION));
    let embedder = Arc::new(BagOfWordsEmbedder::new(EMBEDDING_DIMENSION));
    for record in registry
        .list(&Default::default())
        .await
        .context("failed to list seeded functions")?
    {
        let vector = embedder.embed_text(&format!("{} {}", record.name, record.description)).await?;
        index
            .upsert(
                &record.function_id,
                vector,
                EmbeddingMetadata {
                    name: record.name.clone(),
                    description: record.description.clone(),
                    domain: record.domain.clone(),
                    popularity_score: record.popularity_score,
                },
            )
            .await
            .context("failed to index a seeded function")?;
    }

    let model = Arc::new(ScriptedModel);
    let rules = vec![
        Rule::keywords(["weather"], ["weather.current"], 0.9),
        Rule::keywords(["stock", "price"], ["stocks.quote"], 0.9),
    ];
    let config = FnAgentConfig::default();

    let agent_loop = AgentLoop::new(registry, index, embedder, model, rules, vec![], config);
    let context = AgentContext {
        user_id,
        query: query.clone(),
        conversation_id: None,
        history: vec![],
        user_instructions: None,
        user_preferences: Default::default(),
        language: fnagent::model::context::Language::English,
        reference_clock: chrono::Utc::now(),
    };

    let memory = agent_loop.run(context, None).await;
    display_run(&query, &memory);

    Ok(())
}

fn weather_function() -> FunctionRecord {
    FunctionRecord {
        function_id: "weather.current".to_string(),
        name: "weather.current".to_string(),
        description: "fetches the current weather for a named city".to_string(),
        domain: Domain::new("weather"),
        endpoint: "https://example.invalid/weather".to_string(),
        method: HttpMethod::Get,
        parameter_schema: BTreeMap::new(),
        response_schema: None,
        tags: vec!["weather".to_string()],
        popularity_score: 1.0,
        version: 1,
        deprecated: false,
    }
}

fn stock_price_function() -> FunctionRecord {
    FunctionRecord {
        function_id: "stocks.quote".to_string(),
        name: "stocks.quote".to_string(),
        description: "fetches the latest stock price for a ticker symbol".to_string(),
        domain: Domain::new("finance"),
        endpoint: "https://example.invalid/quote".to_string(),
        method: HttpMethod::Get,
        parameter_schema: BTreeMap::new(),
        response_schema: None,
        tags: vec!["finance".to_string()],
        popularity_score: 1.0,
        version: 1,
        deprecated: false,
    }
}

/// Deterministic, dependency-free stand-in for a real embedding provider:
/// hashes each lowercased word into one of `dimension` buckets and
/// accumulates counts, giving queries that share vocabulary a non-zero
/// cosine similarity without calling out to any service.
struct BagOfWordsEmbedder {
    dimension: usize,
}

impl BagOfWordsEmbedder {
    fn new(dimension: usize) -> Self {
        BagOfWordsEmbedder { dimension }
    }
}

#[async_trait]
impl Embedder for BagOfWordsEmbedder {
    async fn embed_text(&self, text: &str) -> FnAgentResult<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        for word in text.to_lowercase().split_whitespace() {
            let bucket = word_hash(word) as usize % self.dimension;
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn word_hash(word: &str) -> u64 {
    let mut hash = 0xcbf29ce484222325u64;
    for byte in word.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Deterministic, keyword-driven stand-in for a real Language Model: every
/// phase's prompt is distinguishable by its opening line, so this fake
/// drives a complete THINK/ACT/OBSERVE/REFLECT pass without any network
/// call, the same way the crate's own tests exercise `AgentLoop`. ACT walks
/// a fixed search → call → done sequence rather than truly reasoning.
struct ScriptedModel {
    act_calls: std::sync::atomic::AtomicUsize,
}

impl ScriptedModel {
    fn new() -> Self {
        ScriptedModel { act_calls: std::sync::atomic::AtomicUsize::new(0) }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt_parts: &[String], _max_tokens: Option<u32>, _format: ResponseFormat) -> FnAgentResult<String> {
        use std::sync::atomic::Ordering;
        let first = prompt_parts.first().map(|s| s.as_str()).unwrap_or("");

        if first.starts_with("You are reasoning") {
            return Ok("reasoning about the next step".to_string());
        }
        if first.starts_with("Given the thought") {
            let action = match self.act_calls.fetch_add(1, Ordering::SeqCst) {
                0 => "search_functions",
                1 => "call_apis",
                _ => "done",
            };
            return Ok(format!(r#"{{"action": "{action}", "input": {{}}}}"#));
        }
        if first.starts_with("You select at most top_k") {
            return Ok("[]".to_string());
        }
        if first.starts_with("Summarise progress") {
            return Ok(r#"{"reflection": "one step taken", "decision": "continue"}"#.to_string());
        }
        if first.starts_with("Write a final answer") {
            return Ok("Based on the function results gathered above, here is what I found.".to_string());
        }
        Ok("{}".to_string())
    }
}

fn display_run(query: &str, memory: &WorkingMemory) {
    println!("query: {query}");
    println!("status: {:?}", memory.status);
    println!("quality_score: {:.2}", memory.quality_score);
    println!("--------------------------------");
    for iteration in &memory.iterations {
        println!(
            "#{} thought={:?} action={:?} decision={:?}",
            iteration.index, iteration.thought, iteration.action.action_type, iteration.decision
        );
    }
    println!("--------------------------------");
    if let Some(answer) = &memory.final_answer {
        println!("final answer: {answer}");
    }
}
