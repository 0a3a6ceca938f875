//! Completion store abstraction.
//!
//! The intro is shown until the visitor finishes it once. Owners persist that
//! fact through a `CompletionStore` so the intro is skipped on later visits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Durable record of a finished intro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    /// When the completion callback fired.
    pub completed_at: DateTime<Utc>,
}

/// Repository trait for the "intro completed" flag.
#[async_trait]
pub trait CompletionStore: Send + Sync {
    /// Load the completion record, if the intro has been finished.
    async fn load(&self) -> Result<Option<CompletionRecord>, DomainError>;

    /// Persist a completion record, replacing any previous one.
    async fn mark_completed(&self, record: CompletionRecord) -> Result<(), DomainError>;

    /// Forget the completion so the intro is shown again.
    async fn reset(&self) -> Result<(), DomainError>;
}
