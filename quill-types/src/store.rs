//! Local journal store collaborator interface.
//!
//! The sync engine never touches the relational store directly — it drives
//! it through this trait: one full export on the way out, one record-set
//! apply on the way in. The application layer provides the implementation.

use crate::records::RecordSet;
use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by the local journal store.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal export failed: {0}")]
    Export(String),

    #[error("journal apply failed: {0}")]
    Apply(String),
}

/// Which table a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Entry,
    Folder,
    Tag,
}

/// Outcome of applying one imported record.
///
/// A failed record does not abort the surrounding import — failures are
/// aggregated into the sync report instead.
#[derive(Debug, Clone)]
pub struct ApplyResult {
    pub record_id: String,
    pub kind: RecordKind,
    pub error: Option<String>,
}

impl ApplyResult {
    pub fn ok(record_id: impl Into<String>, kind: RecordKind) -> Self {
        Self {
            record_id: record_id.into(),
            kind,
            error: None,
        }
    }

    pub fn failed(record_id: impl Into<String>, kind: RecordKind, error: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            kind,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// The local-data collaborator consumed by the sync engine.
///
/// Implementations must serialize their own write transactions; the sync
/// engine may call `apply_imported` while the UI is writing.
#[async_trait]
pub trait JournalStore: Send + Sync {
    /// Produces the complete local record set.
    async fn export_all(&self) -> Result<RecordSet, JournalError>;

    /// Upserts the given records by id, returning a per-record outcome.
    async fn apply_imported(&self, records: RecordSet) -> Result<Vec<ApplyResult>, JournalError>;
}
