// ./src/embedding_index/brute_force.rs
//! Default Embedding Index backend: an IVF stand-in built from
//! random-hyperplane locality-sensitive hashing buckets, with an exact
//! cosine-similarity scan inside the buckets probed.
//!
//! No external randomness crate is used: the hyperplanes are generated by a
//! small deterministic linear-congruential generator seeded from a fixed
//! constant, which is sufficient for partitioning — the bucket assignment
//! only needs to be *consistent*, not cryptographically random.
use super::index::{EmbeddingIndex, EmbeddingMetadata};
use crate::error::FnAgentResult;
use crate::model::embedding::SearchHit;
use crate::model::function::Domain;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

const LCG_MULTIPLIER: u64 = 6364136223846793005;
const LCG_INCREMENT: u64 = 1442695040888963407;

/// Deterministic pseudo-random unit-ish values in [-1, 1), used only to
/// build hyperplane normals for bucket assignment.
struct Lcg(u64);

impl Lcg {
    fn next_f32(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(LCG_MULTIPLIER).wrapping_add(LCG_INCREMENT);
        // Top 24 bits give enough entropy for a well-distributed hyperplane.
        let bits = (self.0 >> 40) as u32;
        (bits as f32 / (1u32 << 24) as f32) * 2.0 - 1.0
    }
}

struct Entry {
    vector: Vec<f32>,
    metadata: EmbeddingMetadata,
}

/// A brute-force, bucketed cosine-similarity index. `recall_target`
/// controls how many of the nearest buckets are probed (higher = more
/// exact, slower).
pub struct BruteForceIndex {
    dimension: usize,
    n_hyperplanes: usize,
    hyperplanes: Vec<Vec<f32>>,
    entries: RwLock<HashMap<String, Entry>>,
    buckets: RwLock<HashMap<u64, Vec<String>>>,
    recall_target: f32,
}

impl BruteForceIndex {
    pub fn new(dimension: usize) -> Self {
        Self::with_recall_target(dimension, 0.95)
    }

    pub fn with_recall_target(dimension: usize, recall_target: f32) -> Self {
        let n_hyperplanes = 8;
        let mut lcg = Lcg(0x9E3779B97F4A7C15);
        let hyperplanes = (0..n_hyperplanes)
            .map(|_| (0..dimension).map(|_| lcg.next_f32()).collect())
            .collect();
        BruteForceIndex {
            dimension,
            n_hyperplanes,
            hyperplanes,
            entries: RwLock::new(HashMap::new()),
            buckets: RwLock::new(HashMap::new()),
            recall_target: recall_target.clamp(0.0, 1.0),
        }
    }

    fn bucket_key(&self, vector: &[f32]) -> u64 {
        let mut key = 0u64;
        for (i, plane) in self.hyperplanes.iter().enumerate() {
            let dot: f32 = plane.iter().zip(vector).map(|(a, b)| a * b).sum();
            if dot >= 0.0 {
                key |= 1 << i;
            }
        }
        key
    }

    /// Number of buckets to probe for a given recall target: at minimum 1,
    /// scaling up toward all `2^n_hyperplanes` buckets as `recall_target`
    /// approaches 1.0.
    fn probe_count(&self) -> usize {
        let total_buckets = 1usize << self.n_hyperplanes;
        let probes = (total_buckets as f32 * self.recall_target).ceil() as usize;
        probes.clamp(1, total_buckets)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl EmbeddingIndex for BruteForceIndex {
    async fn upsert(&self, function_id: &str, vector: Vec<f32>, metadata: EmbeddingMetadata) -> FnAgentResult<()> {
        // Remove any prior bucket membership first so a re-embedded vector
        // doesn't linger in its old bucket.
        self.delete(function_id).await?;

        let key = self.bucket_key(&vector);
        self.entries.write().unwrap().insert(
            function_id.to_string(),
            Entry { vector, metadata },
        );
        self.buckets
            .write()
            .unwrap()
            .entry(key)
            .or_default()
            .push(function_id.to_string());
        Ok(())
    }

    async fn delete(&self, function_id: &str) -> FnAgentResult<()> {
        if self.entries.write().unwrap().remove(function_id).is_some() {
            let mut buckets = self.buckets.write().unwrap();
            for members in buckets.values_mut() {
                members.retain(|id| id != function_id);
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        domain_filter: Option<&Domain>,
    ) -> FnAgentResult<Vec<SearchHit>> {
        if query_vector.len() != self.dimension {
            return Err(crate::error::FnAgentError::ValidationError(format!(
                "query vector has dimension {}, index expects {}",
                query_vector.len(),
                self.dimension
            )));
        }

        let query_key = self.bucket_key(query_vector);
        let total_buckets = 1u64 << self.n_hyperplanes;
        let probe_count = self.probe_count();

        // Probe buckets in ascending order of Hamming distance from the
        // query's own bucket, which approximates nearest-bucket-first.
        let mut candidate_ids: Vec<String> = Vec::new();
        let buckets = self.buckets.read().unwrap();
        let mut ordered_keys: Vec<u64> = (0..total_buckets).collect();
        ordered_keys.sort_by_key(|k| (k ^ query_key).count_ones());
        for key in ordered_keys.into_iter().take(probe_count) {
            if let Some(members) = buckets.get(&key) {
                candidate_ids.extend(members.iter().cloned());
            }
        }
        drop(buckets);

        let entries = self.entries.read().unwrap();
        let mut hits: Vec<SearchHit> = candidate_ids
            .iter()
            .filter_map(|id| entries.get(id).map(|e| (id, e)))
            .filter(|(_, e)| domain_filter.map(|d| &e.metadata.domain == d).unwrap_or(true))
            .map(|(id, e)| SearchHit {
                function_id: id.clone(),
                score: cosine_similarity(query_vector, &e.vector),
                name: e.metadata.name.clone(),
                description: e.metadata.description.clone(),
                domain: e.metadata.domain.clone(),
                popularity_score: e.metadata.popularity_score,
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(name: &str, domain: &str) -> EmbeddingMetadata {
        EmbeddingMetadata {
            name: name.to_string(),
            description: format!("{name} description"),
            domain: Domain::new(domain),
            popularity_score: 1.0,
        }
    }

    #[tokio::test]
    async fn search_finds_nearest_by_cosine_similarity() {
        let index = BruteForceIndex::new(2);
        index.upsert("weather", vec![1.0, 0.0], metadata("weather", "weather")).await.unwrap();
        index.upsert("unrelated", vec![0.0, 1.0], metadata("unrelated", "misc")).await.unwrap();

        let hits = index.search(&[0.9, 0.1], 5, None).await.unwrap();
        assert_eq!(hits.first().map(|h| h.function_id.as_str()), Some("weather"));
    }

    #[tokio::test]
    async fn delete_removes_entry_from_all_buckets() {
        let index = BruteForceIndex::new(2);
        index.upsert("weather", vec![1.0, 0.0], metadata("weather", "weather")).await.unwrap();
        index.delete("weather").await.unwrap();

        let hits = index.search(&[1.0, 0.0], 5, None).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn upsert_overwrites_previous_vector_for_same_id() {
        let index = BruteForceIndex::new(2);
        index.upsert("weather", vec![0.0, 1.0], metadata("weather", "weather")).await.unwrap();
        index.upsert("weather", vec![1.0, 0.0], metadata("weather", "weather")).await.unwrap();

        let hits = index.search(&[1.0, 0.0], 5, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn domain_filter_excludes_other_domains() {
        let index = BruteForceIndex::new(2);
        index.upsert("weather", vec![1.0, 0.0], metadata("weather", "weather")).await.unwrap();
        index.upsert("stocks", vec![1.0, 0.0], metadata("stocks", "finance")).await.unwrap();

        let hits = index.search(&[1.0, 0.0], 5, Some(&Domain::new("finance"))).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].function_id, "stocks");
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let index = BruteForceIndex::new(2);
        let err = index.search(&[1.0, 0.0, 0.0], 5, None).await.unwrap_err();
        assert!(matches!(err, crate::error::FnAgentError::ValidationError(_)));
    }

    #[tokio::test]
    async fn high_recall_target_probes_more_buckets_than_low() {
        let low = BruteForceIndex::with_recall_target(2, 0.1);
        let high = BruteForceIndex::with_recall_target(2, 1.0);
        assert!(low.probe_count() <= high.probe_count());
    }
}
