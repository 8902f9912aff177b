// ./src/capabilities.rs
//! The two abstract capability interfaces spec §6/§9 call for. Production
//! wiring injects a concrete implementation once at construction; tests
//! substitute deterministic fakes (spec §9 "Dynamic-dispatch LLM/Embedder
//! dependencies").
use crate::error::FnAgentResult;
use async_trait::async_trait;

/// How the Language Model should format its reply (spec §6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    Json,
}

/// A single operation abstracting over whichever LLM backend is wired in.
/// Object-safe so it can be held as `Arc<dyn LanguageModel>` (spec §9).
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// `prompt_parts` are concatenated by the implementation in whatever way
    /// its backend expects (e.g. system/user message roles); this trait
    /// deliberately doesn't prescribe a wire format, only the spec §6
    /// contract: `complete(prompt_parts, max_tokens?, response_format)`.
    async fn complete(
        &self,
        prompt_parts: &[String],
        max_tokens: Option<u32>,
        response_format: ResponseFormat,
    ) -> FnAgentResult<String>;
}

/// A single operation abstracting over whichever embedding backend is wired
/// in. Treated as a stateless pure function (spec §4.2); its failures are
/// retried by the caller, not internally.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_text(&self, text: &str) -> FnAgentResult<Vec<f32>>;

    /// The fixed dimension D every vector this embedder returns has.
    fn dimension(&self) -> usize;
}
