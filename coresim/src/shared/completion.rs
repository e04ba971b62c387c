//! Ordered record of worker terminations.

use std::sync::{Arc, Mutex, PoisonError};

use crate::core::types::CompletionRecord;

/// Append-only list of completion records, one per terminated worker.
#[derive(Debug, Clone, Default)]
pub struct CompletionLog {
    records: Arc<Mutex<Vec<CompletionRecord>>>,
}

impl CompletionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, record: CompletionRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Copy of the records in append order.
    pub fn entries(&self) -> Vec<CompletionRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
