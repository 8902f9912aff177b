// ./src/model/embedding.rs
//! The Embedding Record (spec §3) denormalises just enough Function Record
//! metadata that C2 can answer `search` without a round trip to C1.
use super::function::Domain;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub function_id: String,
    pub vector: Vec<f32>,
    pub name: String,
    pub description: String,
    pub domain: Domain,
    pub popularity_score: f64,
}

/// One hit from `EmbeddingIndex::search` (spec §4.2).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchHit {
    pub function_id: String,
    /// Cosine similarity in [-1, 1].
    pub score: f32,
    pub name: String,
    pub description: String,
    pub domain: Domain,
    pub popularity_score: f64,
}
