//! Sync engine for Quill.
//!
//! Drives complete pull-merge-push cycles against a connected storage
//! provider and owns the conflict policy:
//! - download and decrypt the remote bundle
//! - merge remote changes into the local journal (last-writer-wins per
//!   record)
//! - re-export, encrypt, upload
//! - commit bookkeeping only on full success, so failed cycles retry
//!   safely
//!
//! Every cycle does a full-state exchange rather than deltas — payloads
//! are personal-journal-scale and a full exchange leaves no partial-delta
//! state to corrupt.

mod error;
mod merge;
mod orchestrator;
mod report;

pub use error::{SyncError, SyncResult};
pub use merge::remote_winners;
pub use orchestrator::{
    AlwaysUnmetered, NetworkMonitor, SyncConfig, SyncOrchestrator, SyncPasswordSource,
    TriggerDecision,
};
pub use report::SyncReport;
