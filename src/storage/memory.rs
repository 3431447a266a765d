//! In-memory store, used by tests and library callers that keep records in process

use crate::storage::traits::{PageStore, StorageError, StorageResult};
use crate::storage::PageRecord;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Keeps records in a map keyed by id
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, PageRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all stored records ordered by id
    pub fn records(&self) -> Vec<PageRecord> {
        self.records
            .lock()
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl PageStore for MemoryStore {
    fn save(&self, record: &PageRecord) -> StorageResult<()> {
        let mut records = self.records.lock().map_err(|_| StorageError::Poisoned)?;
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn load(&self, id: &str) -> StorageResult<Option<PageRecord>> {
        let records = self.records.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(records.get(id).cloned())
    }

    fn count(&self) -> StorageResult<usize> {
        let records = self.records.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(records.len())
    }
}
