//! In-process store for tests and offline runs.
//!
//! Behaves like the hosted API where it matters to callers: bulk inserts
//! are all-or-nothing, the unique column is enforced with a Postgres-shaped
//! rejection message, and every successful write broadcasts a change event.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::schema::EntityKind;

use super::{ChangeAction, ChangeEvent, DataStore, CHANGE_CHANNEL_CAPACITY};

#[derive(Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<HashMap<EntityKind, Vec<Value>>>>,
    bulk_calls: Arc<AtomicUsize>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            tables: Arc::new(Mutex::new(HashMap::new())),
            bulk_calls: Arc::new(AtomicUsize::new(0)),
            changes,
        }
    }

    /// Seed a table with rows, bypassing uniqueness checks.
    pub fn seed(&self, kind: EntityKind, rows: Vec<Value>) {
        self.tables.lock().unwrap().entry(kind).or_default().extend(rows);
    }

    /// How many bulk-insert round-trips were attempted.
    pub fn bulk_insert_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of a table's rows.
    pub fn rows(&self, kind: EntityKind) -> Vec<Value> {
        self.tables.lock().unwrap().get(&kind).cloned().unwrap_or_default()
    }

    fn notify(&self, kind: EntityKind, action: ChangeAction, rows: usize) {
        let _ = self.changes.send(ChangeEvent { kind, action, rows });
    }

    fn unique_value<'a>(kind: EntityKind, record: &'a Value) -> Option<&'a str> {
        let column = kind.schema().unique_column?;
        record.get(column).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    fn ensure_id(record: &mut Value) {
        if let Some(obj) = record.as_object_mut() {
            if !obj.contains_key("id") {
                obj.insert("id".into(), json!(Uuid::new_v4().to_string()));
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore for MemoryStore {
    async fn fetch_existing(&self, kind: EntityKind) -> StoreResult<Vec<Value>> {
        Ok(self.rows(kind))
    }

    async fn bulk_insert(&self, kind: EntityKind, records: Vec<Value>) -> StoreResult<usize> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);

        let mut tables = self.tables.lock().unwrap();
        let table = tables.entry(kind).or_default();

        // All-or-nothing: check the whole batch before touching the table.
        if let Some(column) = kind.schema().unique_column {
            let mut batch_ids = Vec::new();
            for record in &records {
                if let Some(id) = Self::unique_value(kind, record) {
                    let stored = table
                        .iter()
                        .any(|row| Self::unique_value(kind, row) == Some(id));
                    if stored || batch_ids.contains(&id) {
                        return Err(StoreError::Rejected(format!(
                            "duplicate key value violates unique constraint \
                             \"{}_{}_key\" Key ({})=({}) already exists.",
                            kind.table(),
                            column,
                            column,
                            id
                        )));
                    }
                    batch_ids.push(id);
                }
            }
        }

        let count = records.len();
        for mut record in records {
            Self::ensure_id(&mut record);
            table.push(record);
        }
        drop(tables);

        self.notify(kind, ChangeAction::Inserted, count);
        Ok(count)
    }

    async fn insert_row(&self, kind: EntityKind, record: Value) -> StoreResult<Value> {
        let mut record = record;
        Self::ensure_id(&mut record);
        self.tables.lock().unwrap().entry(kind).or_default().push(record.clone());
        self.notify(kind, ChangeAction::Inserted, 1);
        Ok(record)
    }

    async fn update_row(&self, kind: EntityKind, id: &str, patch: Value) -> StoreResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let table = tables.entry(kind).or_default();
        let row = table
            .iter_mut()
            .find(|row| row.get("id").and_then(Value::as_str) == Some(id))
            .ok_or_else(|| StoreError::Rejected(format!("no row with id '{id}'")))?;

        if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        }
        drop(tables);

        self.notify(kind, ChangeAction::Updated, 1);
        Ok(())
    }

    async fn delete_row(&self, kind: EntityKind, id: &str) -> StoreResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let table = tables.entry(kind).or_default();
        let before = table.len();
        table.retain(|row| row.get("id").and_then(Value::as_str) != Some(id));
        let removed = before - table.len();
        drop(tables);

        if removed == 0 {
            return Err(StoreError::Rejected(format!("no row with id '{id}'")));
        }
        self.notify(kind, ChangeAction::Deleted, removed);
        Ok(())
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_bulk_insert_and_fetch() {
        let store = MemoryStore::new();
        let count = store
            .bulk_insert(
                EntityKind::Students,
                vec![json!({"student_id": "S-1"}), json!({"student_id": "S-2"})],
            )
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(store.fetch_existing(EntityKind::Students).await.unwrap().len(), 2);
        assert_eq!(store.bulk_insert_calls(), 1);
    }

    #[tokio::test]
    async fn test_bulk_insert_enforces_unique_column() {
        let store = MemoryStore::new();
        store.seed(EntityKind::Students, vec![json!({"student_id": "S-1"})]);

        let err = store
            .bulk_insert(EntityKind::Students, vec![json!({"student_id": "S-1"})])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("duplicate key"));

        // All-or-nothing: nothing landed.
        assert_eq!(store.rows(EntityKind::Students).len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_by_id() {
        let store = MemoryStore::new();
        let row = store
            .insert_row(EntityKind::Centers, json!({"name": "North"}))
            .await
            .unwrap();
        let id = row["id"].as_str().unwrap().to_string();

        store
            .update_row(EntityKind::Centers, &id, json!({"name": "North Campus"}))
            .await
            .unwrap();
        assert_eq!(store.rows(EntityKind::Centers)[0]["name"], "North Campus");

        store.delete_row(EntityKind::Centers, &id).await.unwrap();
        assert!(store.rows(EntityKind::Centers).is_empty());
    }

    #[tokio::test]
    async fn test_writes_broadcast_change_events() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe_changes();

        store
            .bulk_insert(EntityKind::Students, vec![json!({"student_id": "S-1"})])
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, EntityKind::Students);
        assert_eq!(event.action, ChangeAction::Inserted);
        assert_eq!(event.rows, 1);
    }
}
