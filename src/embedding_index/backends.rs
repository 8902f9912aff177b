// ./src/embedding_index/backends.rs
//! Feature-gated Embedding Index backends that are not yet wired to a real
//! vector store. Both return `ConfigError` consistently rather than silently
//! falling back to the brute-force index, so a deployment that enables one
//! of these features gets an honest failure instead of an unannounced
//! accuracy regression (SPEC_FULL.md §1).
use super::index::{EmbeddingIndex, EmbeddingMetadata};
use crate::error::{FnAgentError, FnAgentResult};
use crate::model::embedding::SearchHit;
use crate::model::function::Domain;
use async_trait::async_trait;

#[cfg(feature = "sqlite-vec")]
pub struct SqliteVecIndex;

#[cfg(feature = "sqlite-vec")]
impl SqliteVecIndex {
    pub fn open(_path: &str) -> FnAgentResult<Self> {
        Err(FnAgentError::ConfigError(
            "the sqlite-vec embedding backend is not yet implemented".to_string(),
        ))
    }
}

#[cfg(feature = "sqlite-vec")]
#[async_trait]
impl EmbeddingIndex for SqliteVecIndex {
    async fn upsert(&self, _function_id: &str, _vector: Vec<f32>, _metadata: EmbeddingMetadata) -> FnAgentResult<()> {
        Err(FnAgentError::ConfigError(
            "the sqlite-vec embedding backend is not yet implemented".to_string(),
        ))
    }

    async fn delete(&self, _function_id: &str) -> FnAgentResult<()> {
        Err(FnAgentError::ConfigError(
            "the sqlite-vec embedding backend is not yet implemented".to_string(),
        ))
    }

    async fn search(
        &self,
        _query_vector: &[f32],
        _top_k: usize,
        _domain_filter: Option<&Domain>,
    ) -> FnAgentResult<Vec<SearchHit>> {
        Err(FnAgentError::ConfigError(
            "the sqlite-vec embedding backend is not yet implemented".to_string(),
        ))
    }
}

#[cfg(feature = "qdrant")]
pub struct QdrantIndex;

#[cfg(feature = "qdrant")]
impl QdrantIndex {
    pub fn connect(_url: &str) -> FnAgentResult<Self> {
        Err(FnAgentError::ConfigError(
            "the Qdrant embedding backend is not yet implemented".to_string(),
        ))
    }
}

#[cfg(feature = "qdrant")]
#[async_trait]
impl EmbeddingIndex for QdrantIndex {
    async fn upsert(&self, _function_id: &str, _vector: Vec<f32>, _metadata: EmbeddingMetadata) -> FnAgentResult<()> {
        Err(FnAgentError::ConfigError(
            "the Qdrant embedding backend is not yet implemented".to_string(),
        ))
    }

    async fn delete(&self, _function_id: &str) -> FnAgentResult<()> {
        Err(FnAgentError::ConfigError(
            "the Qdrant embedding backend is not yet implemented".to_string(),
        ))
    }

    async fn search(
        &self,
        _query_vector: &[f32],
        _top_k: usize,
        _domain_filter: Option<&Domain>,
    ) -> FnAgentResult<Vec<SearchHit>> {
        Err(FnAgentError::ConfigError(
            "the Qdrant embedding backend is not yet implemented".to_string(),
        ))
    }
}
