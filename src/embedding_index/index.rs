// ./src/embedding_index/index.rs
//! The Embedding Index contract (spec §4.2).
use crate::error::FnAgentResult;
use crate::model::embedding::SearchHit;
use crate::model::function::Domain;
use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingIndex: Send + Sync {
    async fn upsert(&self, function_id: &str, vector: Vec<f32>, metadata: EmbeddingMetadata) -> FnAgentResult<()>;

    async fn delete(&self, function_id: &str) -> FnAgentResult<()>;

    /// Returns up to `top_k` hits sorted descending by cosine similarity,
    /// optionally restricted to `domain_filter` (spec §4.2). Deprecated or
    /// deleted functions never appear (enforced by never upserting them, and
    /// by `delete` being called on every CDC delete/deprecation event).
    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        domain_filter: Option<&Domain>,
    ) -> FnAgentResult<Vec<SearchHit>>;
}

/// Denormalised metadata stored alongside a vector (spec §3 Embedding
/// Record).
#[derive(Clone, Debug)]
pub struct EmbeddingMetadata {
    pub name: String,
    pub description: String,
    pub domain: Domain,
    pub popularity_score: f64,
}
