// ./src/registry/store.rs
//! The Registry Store contract (spec §4.1) and its two implementations: an
//! in-memory store used by fakes/tests, and a `rusqlite`-backed store used
//! as the default persistent backend.
use super::cdc::{ChangeEvent, ChangeOp};
use crate::error::{FnAgentError, FnAgentResult};
use crate::model::function::{FunctionRecord, ListFilter};
use async_stream::stream;
use async_trait::async_trait;
use futures::Stream;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Read contract consumed by C2/C4/C5/C6. The write path (CRUD REST
/// endpoints) is explicitly out of scope (spec §1); implementations may
/// offer their own write API outside this trait (as `SqliteRegistryStore`
/// does) without it being part of the core contract.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    async fn get_by_id(&self, function_id: &str) -> FnAgentResult<Option<FunctionRecord>>;

    async fn list(&self, filter: &ListFilter) -> FnAgentResult<Vec<FunctionRecord>>;

    /// At-least-once stream of changes, consumed by the Embedding Index to
    /// stay in sync (spec §4.1).
    fn subscribe_changes(&self) -> std::pin::Pin<Box<dyn Stream<Item = ChangeEvent> + Send>>;
}

/// In-memory implementation: the default backend for tests and for the
/// deterministic fakes spec §9 calls for.
pub struct InMemoryRegistryStore {
    records: RwLock<HashMap<String, FunctionRecord>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl InMemoryRegistryStore {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(1024);
        InMemoryRegistryStore {
            records: RwLock::new(HashMap::new()),
            changes: tx,
        }
    }

    /// Upserts a record and emits the corresponding CDC event. Not part of
    /// the read-only `RegistryStore` trait (spec §1's write path is out of
    /// scope); exposed as an inherent method so tests and fakes can seed
    /// the registry directly.
    pub fn upsert(&self, record: FunctionRecord) {
        let function_id = record.function_id.clone();
        self.records.write().unwrap().insert(function_id.clone(), record.clone());
        let _ = self.changes.send(ChangeEvent {
            op: ChangeOp::Upsert,
            function_id,
            record: Some(record),
        });
    }

    pub fn delete(&self, function_id: &str) {
        self.records.write().unwrap().remove(function_id);
        let _ = self.changes.send(ChangeEvent {
            op: ChangeOp::Delete,
            function_id: function_id.to_string(),
            record: None,
        });
    }
}

impl Default for InMemoryRegistryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryStore for InMemoryRegistryStore {
    async fn get_by_id(&self, function_id: &str) -> FnAgentResult<Option<FunctionRecord>> {
        Ok(self.records.read().unwrap().get(function_id).cloned())
    }

    async fn list(&self, filter: &ListFilter) -> FnAgentResult<Vec<FunctionRecord>> {
        let records = self.records.read().unwrap();
        let mut out: Vec<FunctionRecord> = records
            .values()
            .filter(|r| filter.include_deprecated || !r.deprecated)
            .filter(|r| filter.domain.as_ref().map(|d| &r.domain == d).unwrap_or(true))
            .filter(|r| filter.tags.iter().all(|t| r.tags.contains(t)))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.function_id.cmp(&b.function_id));
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

/// `rusqlite`-backed implementation. `rusqlite::Connection` is not `Send`
/// across an `.await` boundary by itself, so every operation is dispatched
/// through `tokio::task::spawn_blocking` against a connection guarded by a
/// blocking `std::sync::Mutex` — the standard pattern for wrapping a
/// synchronous SQL driver behind an async trait.
pub struct SqliteRegistryStore {
    conn: Arc<std::sync::Mutex<rusqlite::Connection>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl SqliteRegistryStore {
    pub fn open(path: &str) -> FnAgentResult<Self> {
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| FnAgentError::ConfigError(format!("failed to open registry database: {e}")))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS functions (
                function_id TEXT PRIMARY KEY,
                record_json TEXT NOT NULL,
                domain TEXT NOT NULL,
                deprecated INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| FnAgentError::ConfigError(format!("failed to initialise registry schema: {e}")))?;
        let (tx, _rx) = broadcast::channel(1024);
        Ok(SqliteRegistryStore {
            conn: Arc::new(std::sync::Mutex::new(conn)),
            changes: tx,
        })
    }

    pub fn in_memory() -> FnAgentResult<Self> {
        Self::open(":memory:")
    }

    /// Upserts a record, persists it, and emits the CDC event. Like
    /// `InMemoryRegistryStore::upsert`, this is outside the read-only
    /// `RegistryStore` trait (spec §1).
    pub async fn upsert(&self, record: FunctionRecord) -> FnAgentResult<()> {
        let conn = self.conn.clone();
        let record_clone = record.clone();
        tokio::task::spawn_blocking(move || -> FnAgentResult<()> {
            let json = serde_json::to_string(&record_clone)?;
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO functions (function_id, record_json, domain, deprecated)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(function_id) DO UPDATE SET
                    record_json = excluded.record_json,
                    domain = excluded.domain,
                    deprecated = excluded.deprecated",
                rusqlite::params![
                    record_clone.function_id,
                    json,
                    record_clone.domain.0,
                    record_clone.deprecated as i64,
                ],
            )
            .map_err(|e| FnAgentError::Other(format!("registry upsert failed: {e}")))?;
            Ok(())
        })
        .await
        .map_err(|e| FnAgentError::Other(format!("registry task panicked: {e}")))??;

        let _ = self.changes.send(ChangeEvent {
            op: ChangeOp::Upsert,
            function_id: record.function_id.clone(),
            record: Some(record),
        });
        Ok(())
    }

    pub async fn delete(&self, function_id: &str) -> FnAgentResult<()> {
        let conn = self.conn.clone();
        let id = function_id.to_string();
        tokio::task::spawn_blocking(move || -> FnAgentResult<()> {
            let conn = conn.lock().unwrap();
            conn.execute("DELETE FROM functions WHERE function_id = ?1", [&id])
                .map_err(|e| FnAgentError::Other(format!("registry delete failed: {e}")))?;
            Ok(())
        })
        .await
        .map_err(|e| FnAgentError::Other(format!("registry task panicked: {e}")))??;

        let _ = self.changes.send(ChangeEvent {
            op: ChangeOp::Delete,
            function_id: function_id.to_string(),
            record: None,
        });
        Ok(())
    }
}

#[async_trait]
impl RegistryStore for SqliteRegistryStore {
    async fn get_by_id(&self, function_id: &str) -> FnAgentResult<Option<FunctionRecord>> {
        let conn = self.conn.clone();
        let id = function_id.to_string();
        tokio::task::spawn_blocking(move || -> FnAgentResult<Option<FunctionRecord>> {
            let conn = conn.lock().unwrap();
            let mut stmt = conn
                .prepare("SELECT record_json FROM functions WHERE function_id = ?1")
                .map_err(|e| FnAgentError::Other(format!("registry query failed: {e}")))?;
            let mut rows = stmt
                .query([&id])
                .map_err(|e| FnAgentError::Other(format!("registry query failed: {e}")))?;
            if let Some(row) = rows.next().map_err(|e| FnAgentError::Other(e.to_string()))? {
                let json: String = row.get(0).map_err(|e| FnAgentError::Other(e.to_string()))?;
                let record: FunctionRecord = serde_json::from_str(&json)?;
                Ok(Some(record))
            } else {
                Ok(None)
            }
        })
        .await
        .map_err(|e| FnAgentError::Other(format!("registry task panicked: {e}")))?
    }

    async fn list(&self, filter: &ListFilter) -> FnAgentResult<Vec<FunctionRecord>> {
        let conn = self.conn.clone();
        let filter = filter.clone();
        tokio::task::spawn_blocking(move || -> FnAgentResult<Vec<FunctionRecord>> {
            let conn = conn.lock().unwrap();
            let mut stmt = conn
                .prepare("SELECT record_json FROM functions ORDER BY function_id")
                .map_err(|e| FnAgentError::Other(format!("registry query failed: {e}")))?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| FnAgentError::Other(format!("registry query failed: {e}")))?;
            let mut out = Vec::new();
            for row in rows {
                let json = row.map_err(|e| FnAgentError::Other(e.to_string()))?;
                let record: FunctionRecord = serde_json::from_str(&json)?;
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
        })
        .await
        .map_err(|e| FnAgentError::Other(format!("registry task panicked: {e}")))?
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
