//! JSON-file implementation of the `CompletionStore` trait.
//!
//! The file holds one small document:
//!
//! ```json
//! { "intro_completed": true, "completed_at": "2026-01-15T10:00:00Z" }
//! ```
//!
//! A missing file means the intro has not been completed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use cigar_core::error::DomainError;
use cigar_core::store::{CompletionRecord, CompletionStore};

#[derive(Debug, Serialize, Deserialize)]
struct CompletionDocument {
    intro_completed: bool,
    completed_at: Option<DateTime<Utc>>,
}

/// Completion store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileCompletionStore {
    path: PathBuf,
}

impl FileCompletionStore {
    /// Creates a store reading and writing `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn infrastructure(&self, action: &str, err: impl std::fmt::Display) -> DomainError {
        DomainError::Infrastructure(format!("{action} {}: {err}", self.path.display()))
    }
}

#[async_trait]
impl CompletionStore for FileCompletionStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Option<CompletionRecord>, DomainError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.infrastructure("cannot read", e)),
        };
        let document: CompletionDocument =
            serde_json::from_slice(&bytes).map_err(|e| self.infrastructure("cannot parse", e))?;
        Ok(match (document.intro_completed, document.completed_at) {
            (true, Some(completed_at)) => Some(CompletionRecord { completed_at }),
            _ => None,
        })
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn mark_completed(&self, record: CompletionRecord) -> Result<(), DomainError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.infrastructure("cannot create directory for", e))?;
        }
        let document = CompletionDocument {
            intro_completed: true,
            completed_at: Some(record.completed_at),
        };
        // Serialization of derived Serialize types is infallible.
        let bytes = serde_json::to_vec_pretty(&document).expect("completion document serializes");

        // Write-then-rename: readers never observe a partial document. Each
        // writer stages under its own name.
        let staging = self.path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        if let Err(e) = tokio::fs::write(&staging, bytes).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(self.infrastructure("cannot write", e));
        }
        if let Err(e) = tokio::fs::rename(&staging, &self.path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(self.infrastructure("cannot replace", e));
        }
        debug!("intro marked completed");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn reset(&self) -> Result<(), DomainError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("intro completion reset");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.infrastructure("cannot remove", e)),
        }
    }
}
