use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::domain::{RunId, ValuationRecord};

/// Storage abstraction for finished valuation records. The store is
/// append-only: corrections are new runs referencing the superseded run id,
/// never in-place edits.
pub trait ValuationRecordStore: Send + Sync {
    fn insert(&self, record: ValuationRecord) -> Result<ValuationRecord, StoreError>;
    fn fetch(&self, run_id: &RunId) -> Result<Option<ValuationRecord>, StoreError>;
    fn recent(&self, limit: usize) -> Result<Vec<ValuationRecord>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record for run already exists")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed by run id; suitable for tests and single-process deployments.
#[derive(Default, Clone)]
pub struct InMemoryValuationStore {
    records: Arc<Mutex<BTreeMap<RunId, ValuationRecord>>>,
}

impl ValuationRecordStore for InMemoryValuationStore {
    fn insert(&self, record: ValuationRecord) -> Result<ValuationRecord, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if guard.contains_key(&record.run_id) {
            return Err(StoreError::Conflict);
        }
        guard.insert(record.run_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, run_id: &RunId) -> Result<Option<ValuationRecord>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.get(run_id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<ValuationRecord>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.values().rev().take(limit).cloned().collect())
    }
}
