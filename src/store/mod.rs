//! Backing-store collaborators.
//!
//! All persistence is delegated to a hosted data API; this crate only talks
//! to it through the [`DataStore`] contract so the import pipeline and the
//! HTTP layer can be exercised without a live network dependency.
//!
//! - [`RestStore`] - the hosted PostgREST-style data API
//! - [`MemoryStore`] - in-process tables for tests and offline runs
//!
//! Both broadcast a [`ChangeEvent`] after each successful write; the server
//! streams those to the dashboard so open views refresh.

pub mod memory;
pub mod rest;

pub use memory::MemoryStore;
pub use rest::RestStore;

use std::future::Future;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::StoreResult;
use crate::schema::EntityKind;

/// What a write did, for dashboard refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Inserted,
    Updated,
    Deleted,
}

/// One change notification: which table moved and by how many rows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub kind: EntityKind,
    pub action: ChangeAction,
    pub rows: usize,
}

/// Capacity of the change broadcast channel.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 100;

/// The backing-store contract consumed by the import pipeline and the
/// dashboard row operations.
///
/// `bulk_insert` is atomic all-or-nothing: either every record of the batch
/// is persisted or none is. Uniqueness violations surface as raw
/// rejections; classification is the caller's concern.
pub trait DataStore: Send + Sync {
    /// All currently persisted rows of a kind, in store order.
    fn fetch_existing(
        &self,
        kind: EntityKind,
    ) -> impl Future<Output = StoreResult<Vec<Value>>> + Send;

    /// Persist a batch in a single round-trip. Returns the inserted count.
    fn bulk_insert(
        &self,
        kind: EntityKind,
        records: Vec<Value>,
    ) -> impl Future<Output = StoreResult<usize>> + Send;

    /// Insert one row; returns the stored representation.
    fn insert_row(
        &self,
        kind: EntityKind,
        record: Value,
    ) -> impl Future<Output = StoreResult<Value>> + Send;

    /// Patch one row by primary key.
    fn update_row(
        &self,
        kind: EntityKind,
        id: &str,
        patch: Value,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Delete one row by primary key.
    fn delete_row(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Subscribe to change notifications for dashboard refresh.
    fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent>;
}
