//! Durable storage for per-owner graph state.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::knowledge::schema::{initialize_schema, is_initialized};
use crate::knowledge::types::KnowledgeNode;

/// Full serialized state of one owner's graph.
///
/// Keys are node ids in their string form. `connections` holds the
/// adjacency sets as arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: BTreeMap<String, KnowledgeNode>,
    pub connections: BTreeMap<String, Vec<String>>,
    pub embeddings: BTreeMap<String, Vec<f32>>,
}

impl GraphSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Keyed storage for graph snapshots, one record per owner.
pub trait GraphStore: Send + Sync {
    /// Load the snapshot stored for `owner_id`, if any.
    fn load(&self, owner_id: &str) -> Result<Option<GraphSnapshot>>;

    /// Replace the snapshot stored for `owner_id`.
    fn save(&self, owner_id: &str, snapshot: &GraphSnapshot) -> Result<()>;

    /// Delete the snapshot for `owner_id`. Returns true if one existed.
    fn remove(&self, owner_id: &str) -> Result<bool>;
}

/// SQLite-backed graph store.
pub struct SqliteGraphStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGraphStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Initialize schema if needed
        if !is_initialized(&conn) {
            initialize_schema(&conn)?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| Error::Internal(format!("Failed to lock connection: {}", e)))?;
        f(&conn).map_err(Error::from)
    }
}

impl GraphStore for SqliteGraphStore {
    fn load(&self, owner_id: &str) -> Result<Option<GraphSnapshot>> {
        let payload: Option<String> = self.with_conn(|conn| {
            conn.query_row(
                "SELECT payload FROM graph_state WHERE owner_id = ?1",
                params![owner_id],
                |row| row.get(0),
            )
            .optional()
        })?;

        payload.map(|p| GraphSnapshot::from_json(&p)).transpose()
    }

    fn save(&self, owner_id: &str, snapshot: &GraphSnapshot) -> Result<()> {
        let payload = snapshot.to_json()?;

        // Upsert: one row per owner
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO graph_state (owner_id, payload, node_count, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(owner_id) DO UPDATE SET
                    payload = excluded.payload,
                    node_count = excluded.node_count,
                    updated_at = excluded.updated_at",
                params![
                    owner_id,
                    payload,
                    snapshot.nodes.len() as i64,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    fn remove(&self, owner_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute(
                "DELETE FROM graph_state WHERE owner_id = ?1",
                params![owner_id],
            )?;
            Ok(rows > 0)
        })
    }
}

/// Store that keeps serialized snapshots in process memory.
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    records: Mutex<HashMap<String, String>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw serialized payload for `owner_id`.
    pub fn raw(&self, owner_id: &str) -> Option<String> {
        self.records.lock().ok()?.get(owner_id).cloned()
    }
}

impl GraphStore for InMemoryGraphStore {
    fn load(&self, owner_id: &str) -> Result<Option<GraphSnapshot>> {
        let records = self
            .records
            .lock()
            .map_err(|e| Error::Internal(format!("Failed to lock store: {}", e)))?;
        records
            .get(owner_id)
            .map(|p| GraphSnapshot::from_json(p))
            .transpose()
    }

    fn save(&self, owner_id: &str, snapshot: &GraphSnapshot) -> Result<()> {
        let payload = snapshot.to_json()?;
        self.records
            .lock()
            .map_err(|e| Error::Internal(format!("Failed to lock store: {}", e)))?
            .insert(owner_id.to_string(), payload);
        Ok(())
    }

    fn remove(&self, owner_id: &str) -> Result<bool> {
        Ok(self
            .records
            .lock()
            .map_err(|e| Error::Internal(format!("Failed to lock store: {}", e)))?
            .remove(owner_id)
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::types::NodeId;
    use pretty_assertions::assert_eq;

    fn sample_snapshot() -> GraphSnapshot {
        let now = Utc::now();
        let id = NodeId::new();
        let node = KnowledgeNode {
            id,
            title: "Title".into(),
            content: "Body".into(),
            node_type: "note".into(),
            created_at: now,
            updated_at: now,
            owner_id: "user-1".into(),
            connections: Vec::new(),
            embedding: vec![0.5; 4],
        };

        let mut snapshot = GraphSnapshot::default();
        snapshot.nodes.insert(id.to_string(), node);
        snapshot.connections.insert(id.to_string(), Vec::new());
        snapshot.embeddings.insert(id.to_string(), vec![0.5; 4]);
        snapshot
    }

    #[test]
    fn test_sqlite_save_and_load() {
        let store = SqliteGraphStore::in_memory().unwrap();
        let snapshot = sample_snapshot();

        store.save("user-1", &snapshot).unwrap();
        assert_eq!(store.load("user-1").unwrap(), Some(snapshot));
        assert_eq!(store.load("user-2").unwrap(), None);
    }

    #[test]
    fn test_sqlite_save_replaces() {
        let store = SqliteGraphStore::in_memory().unwrap();
        store.save("user-1", &sample_snapshot()).unwrap();
        store.save("user-1", &GraphSnapshot::default()).unwrap();

        assert_eq!(store.load("user-1").unwrap(), Some(GraphSnapshot::default()));
        let rows: i64 = store
            .with_conn(|conn| conn.query_row("SELECT COUNT(*) FROM graph_state", [], |row| row.get(0)))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_sqlite_file_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        let snapshot = sample_snapshot();

        SqliteGraphStore::open(&path)
            .unwrap()
            .save("user-1", &snapshot)
            .unwrap();

        let reopened = SqliteGraphStore::open(&path).unwrap();
        assert_eq!(reopened.load("user-1").unwrap(), Some(snapshot));
        assert!(reopened.remove("user-1").unwrap());
        assert!(!reopened.remove("user-1").unwrap());
    }

    #[test]
    fn test_in_memory_store() {
        let store = InMemoryGraphStore::new();
        store.save("user-1", &sample_snapshot()).unwrap();

        let raw = store.raw("user-1").unwrap();
        assert!(raw.contains("\"nodes\""));
        assert!(raw.contains("\"embeddings\""));
        assert!(store.load("user-1").unwrap().is_some());
    }

    #[test]
    fn test_corrupt_payload_is_error() {
        let store = SqliteGraphStore::in_memory().unwrap();
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO graph_state (owner_id, payload) VALUES ('user-1', '{oops')",
                    [],
                )
            })
            .unwrap();

        assert!(matches!(
            store.load("user-1"),
            Err(Error::Serialization(_))
        ));
    }
}
