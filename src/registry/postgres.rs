// ./src/registry/postgres.rs
//! Optional PostgreSQL-backed Registry Store, behind the `postgres` feature
//! (SPEC_FULL.md §1 "ambient stack... the existing postgres feature").
//! Unlike `SqliteRegistryStore`, `tokio_postgres::Client` is natively async,
//! so no `spawn_blocking` dance is required here.
use super::cdc::{ChangeEvent, ChangeOp};
use crate::error::{FnAgentError, FnAgentResult};
use crate::model::function::{FunctionRecord, ListFilter};
use async_stream::stream;
use async_trait::async_trait;
use futures::Stream;
use tokio::sync::broadcast;
use tokio_postgres::{Client, NoTls};

pub struct PostgresRegistryStore {
    client: Client,
    changes: broadcast::Sender<ChangeEvent>,
}

impl PostgresRegistryStore {
    pub async fn connect(config: &str) -> FnAgentResult<Self> {
        let (client, connection) = tokio_postgres::connect(config, NoTls)
            .await
            .map_err(|e| FnAgentError::ConfigError(format!("failed to connect to registry database: {e}")))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "registry postgres connection terminated");
            }
        });

        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS functions (
                    function_id TEXT PRIMARY KEY,
                    record_json JSONB NOT NULL,
                    domain TEXT NOT NULL,
                    deprecated BOOLEAN NOT NULL
                )",
            )
            .await
            .map_err(|e| FnAgentError::ConfigError(format!("failed to initialise registry schema: {e}")))?;

        let (tx, _rx) = broadcast::channel(1024);
        Ok(PostgresRegistryStore { client, changes: tx })
    }

    pub async fn upsert(&self, record: FunctionRecord) -> FnAgentResult<()> {
        let json = serde_json::to_value(&record)?;
        self.client
            .execute(
                "INSERT INTO functions (function_id, record_json, domain, deprecated)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (function_id) DO UPDATE SET
                    record_json = excluded.record_json,
                    domain = excluded.domain,
                    deprecated = excluded.deprecated",
                &[&record.function_id, &json, &record.domain.0, &record.deprecated],
            )
            .await
            .map_err(|e| FnAgentError::Other(format!("registry upsert failed: {e}")))?;

        let _ = self.changes.send(ChangeEvent {
            op: ChangeOp::Upsert,
            function_id: record.function_id.clone(),
            record: Some(record),
        });
        Ok(())
    }

    pub async fn delete(&self, function_id: &str) -> FnAgentResult<()> {
        self.client
            .execute("DELETE FROM functions WHERE function_id = $1", &[&function_id])
            .await
            .map_err(|e| FnAgentError::Other(format!("registry delete failed: {e}")))?;

        let _ = self.changes.send(ChangeEvent {
            op: ChangeOp::Delete,
            function_id: function_id.to_string(),
            record: None,
        });
        Ok(())
    }
}

#[async_trait]
impl super::store::RegistryStore for PostgresRegistryStore {
    async fn get_by_id(&self, function_id: &str) -> FnAgentResult<Option<FunctionRecord>> {
        let row = self
            .client
            .query_opt("SELECT record_json FROM functions WHERE function_id = $1", &[&function_id])
            .await
            .map_err(|e| FnAgentError::Other(format!("registry query failed: {e}")))?;
        match row {
            Some(row) => {
                let json: serde_json::Value = row.get(0);
                Ok(Some(serde_json::from_value(json)?))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &ListFilter) -> FnAgentResult<Vec<FunctionRecord>> {
        let rows = self
            .client
            .query("SELECT record_json FROM functions ORDER BY function_id", &[])
            .await
            .map_err(|e| FnAgentError::Other(format!("registry query failed: {e}")))?;
        let mut out = Vec::new();
        for row in rows {
            let json: serde_json::Value = row.get(0);
            let record: FunctionRecord = serde_json::from_value(json)?;
            if !filter.include_deprecated && record.deprecated {
                continue;
            }
            if let Some(domain) = &filter.domain {
                if &record.domain != domain {
                    continue;
                }
            }
            if !filter.tags.iter().all(|t| record.tags.contains(t)) {
                continue;
            }
            out.push(record);
        }
        Ok(out)
    }

    fn subscribe_changes(&self) -> std::pin::Pin<Box<dyn Stream<Item = ChangeEvent> + Send>> {
        let mut rx = self.changes.subscribe();
        Box::pin(stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
