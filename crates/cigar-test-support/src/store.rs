//! Test stores — mock `CompletionStore` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use cigar_core::error::DomainError;
use cigar_core::store::{CompletionRecord, CompletionStore};

/// A completion store that keeps its record in memory and counts writes.
#[derive(Debug, Default)]
pub struct InMemoryCompletionStore {
    record: Mutex<Option<CompletionRecord>>,
    writes: Mutex<Vec<CompletionRecord>>,
}

impl InMemoryCompletionStore {
    /// Create an empty store (intro not yet completed).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `record`.
    #[must_use]
    pub fn completed(record: CompletionRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of every record passed to `mark_completed`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn writes(&self) -> Vec<CompletionRecord> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionStore for InMemoryCompletionStore {
    async fn load(&self) -> Result<Option<CompletionRecord>, DomainError> {
        Ok(*self.record.lock().unwrap())
    }

    async fn mark_completed(&self, record: CompletionRecord) -> Result<(), DomainError> {
        *self.record.lock().unwrap() = Some(record);
        self.writes.lock().unwrap().push(record);
        Ok(())
    }

    async fn reset(&self) -> Result<(), DomainError> {
        *self.record.lock().unwrap() = None;
        Ok(())
    }
}

/// A completion store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingCompletionStore;

#[async_trait]
impl CompletionStore for FailingCompletionStore {
    async fn load(&self) -> Result<Option<CompletionRecord>, DomainError> {
        Err(DomainError::Infrastructure("storage unavailable".into()))
    }

    async fn mark_completed(&self, _record: CompletionRecord) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("storage unavailable".into()))
    }

    async fn reset(&self) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("storage unavailable".into()))
    }
}
