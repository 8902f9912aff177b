// ./src/embedding_index/mod.rs
//! The Embedding Index (C2, spec §4.2): a searchable vector index over
//! Function Record descriptions, kept fresh from C1 via `sync`.
pub mod backends;
pub mod brute_force;
pub mod index;
pub mod sync;

#[cfg(feature = "qdrant")]
pub use backends::QdrantIndex;
#[cfg(feature = "sqlite-vec")]
pub use backends::SqliteVecIndex;
pub use brute_force::BruteForceIndex;
pub use index::{EmbeddingIndex, EmbeddingMetadata};
pub use sync::IndexSynchronizer;
