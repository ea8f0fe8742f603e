//! In-memory record store (for testing).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use barrier_core::{BarrierRecord, RecordStore, StoreError, StoreResult};
use tokio::sync::RwLock;

/// Record store holding rows in a map keyed by id.
///
/// Cloning shares the underlying rows, so a test can keep a handle and edit
/// the "database" while the service reads from it.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<RwLock<HashMap<String, BarrierRecord>>>,
    lookups: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_record(record: BarrierRecord) -> Self {
        let store = Self::new();
        store.upsert(record).await;
        store
    }

    /// Insert or replace the row with the record's id.
    pub async fn upsert(&self, record: BarrierRecord) {
        self.records
            .write()
            .await
            .insert(record.barrier_id.clone(), record);
    }

    /// Apply `f` to the row with `id`. Returns false if there is no such row.
    pub async fn update<F>(&self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut BarrierRecord),
    {
        match self.records.write().await.get_mut(id) {
            Some(record) => {
                f(record);
                true
            }
            None => false,
        }
    }

    pub async fn remove(&self, id: &str) -> Option<BarrierRecord> {
        self.records.write().await.remove(id)
    }

    /// Number of lookups served so far.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn begin_lookup(&self) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn lookup_by_name(&self, name: &str) -> StoreResult<BarrierRecord> {
        self.begin_lookup()?;
        self.records
            .read()
            .await
            .values()
            .find(|r| r.name == name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn lookup_by_id(&self, id: &str) -> StoreResult<BarrierRecord> {
        self.begin_lookup()?;
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
