// ./src/embedding_index/sync.rs
//! Keeps an `EmbeddingIndex` eventually consistent with a `RegistryStore`
//! (spec §4.2 "Freshness... after a CDC event is applied, the affected
//! function is reflected within one refresh cycle"). Registry writes are
//! explicitly out of scope (spec §1); this synchroniser is the one
//! consumer-side piece of plumbing that bridges C1's CDC stream to C2, kept
//! out of the agent's hot path per spec §9 "do not embed registry writes
//! inside the agent's hot path".
use crate::capabilities::Embedder;
use crate::constants::DEFAULT_INDEX_REFRESH_SECS;
use crate::embedding_index::index::{EmbeddingIndex, EmbeddingMetadata};
use crate::error::FnAgentResult;
use crate::model::function::ListFilter;
use crate::registry::{ChangeOp, RegistryStore};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

pub struct IndexSynchronizer<R, I, E> {
    registry: Arc<R>,
    index: Arc<I>,
    embedder: Arc<E>,
    refresh_interval: Duration,
}

impl<R, I, E> IndexSynchronizer<R, I, E>
where
    R: RegistryStore + 'static,
    I: EmbeddingIndex + 'static,
    E: Embedder + 'static,
{
    pub fn new(registry: Arc<R>, index: Arc<I>, embedder: Arc<E>) -> Self {
        IndexSynchronizer {
            registry,
            index,
            embedder,
            refresh_interval: Duration::from_secs(DEFAULT_INDEX_REFRESH_SECS),
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Applies one CDC event to the index: embeds the description for an
    /// upsert (skipping deprecated records, spec §4.1 "excluded... from C2's
    /// search results"), or deletes on a delete event. Idempotent by
    /// construction — re-applying the same upsert just re-embeds and
    /// re-inserts (spec §4.1 "C2 is idempotent on replay").
    pub async fn apply_event(&self, event: &crate::registry::ChangeEvent) -> FnAgentResult<()> {
        match event.op {
            ChangeOp::Delete => self.index.delete(&event.function_id).await,
            ChangeOp::Upsert => {
                let Some(record) = &event.record else {
                    return Ok(());
                };
                if record.deprecated {
                    return self.index.delete(&event.function_id).await;
                }
                let vector = self.embedder.embed_text(&record.description).await?;
                self.index
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
            }
        }
    }

    /// Full reconciliation pass: re-embeds every non-deprecated record from
    /// `RegistryStore::list`. This is what makes CDC delivery's
    /// at-least-once guarantee sufficient even though a lagged broadcast
    /// receiver alone would only be at-most-once for the dropped window
    /// (SPEC_FULL.md §4.1).
    pub async fn reconcile(&self) -> FnAgentResult<()> {
        let records = self.registry.list(&ListFilter::default()).await?;
        for record in records {
            let vector = self.embedder.embed_text(&record.description).await?;
            self.index
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
                .await?;
        }
        Ok(())
    }

    /// Runs forever: applies live CDC events as they arrive, and
    /// reconciles on a fixed interval as a backstop. Intended to be spawned
    /// as a background task by the embedding process, not called from
    /// within a ReAct run.
    pub async fn run(&self) -> FnAgentResult<()> {
        let mut changes = self.registry.subscribe_changes();
        let mut ticker = tokio::time::interval(self.refresh_interval);
        loop {
            tokio::select! {
                event = changes.next() => {
                    match event {
                        Some(event) => {
                            if let Err(e) = self.apply_event(&event).await {
                                tracing::warn!(error = %e, function_id = %event.function_id, "failed to apply CDC event to embedding index");
                            }
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.reconcile().await {
                        tracing::warn!(error = %e, "embedding index reconciliation pass failed");
                    }
                }
            }
        }
        Ok(())
    }
}
