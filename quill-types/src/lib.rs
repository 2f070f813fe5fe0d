//! Shared domain types for the Quill sync core.
//!
//! Defines the journal record model exchanged between the local store and
//! the cloud backup pipeline, the closed set of storage provider
//! identities, and the collaborator trait the sync engine drives the local
//! database through. No I/O lives here.

mod provider;
mod records;
mod store;

pub use provider::Provider;
pub use records::{Folder, JournalEntry, RecordCounts, RecordSet, Tag};
pub use store::{ApplyResult, JournalError, JournalStore, RecordKind};

/// Current wall-clock time as milliseconds since the Unix epoch.
///
/// All persisted timestamps in the sync core use this representation.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
