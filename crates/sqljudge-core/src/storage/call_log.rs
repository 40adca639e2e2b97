use crate::model::LlmCallRecord;
use crate::storage::Store;
use std::sync::{Mutex, PoisonError};

/// Append-only sink for completion-service telemetry. Shared across requests.
pub trait CallLog: Send + Sync {
    fn append(&self, record: &LlmCallRecord) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct StoreCallLog {
    store: Store,
}

impl StoreCallLog {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

impl CallLog for StoreCallLog {
    fn append(&self, record: &LlmCallRecord) -> anyhow::Result<()> {
        self.store.insert_llm_call(record)
    }
}

/// Keeps records in memory; used by tests and by runs without a store.
#[derive(Default)]
pub struct MemoryCallLog {
    records: Mutex<Vec<LlmCallRecord>>,
}

impl MemoryCallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LlmCallRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CallLog for MemoryCallLog {
    fn append(&self, record: &LlmCallRecord) -> anyhow::Result<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}
