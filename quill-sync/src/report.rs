//! Sync cycle result summary.

use quill_types::{ApplyResult, Provider};

/// What one pull-merge-push cycle did.
#[derive(Debug)]
pub struct SyncReport {
    pub provider: Provider,
    /// Remote records applied to the local journal.
    pub merged: usize,
    /// Per-record apply failures. A non-empty list does not mean the
    /// cycle failed — partial merge failures are reported, not fatal.
    pub failures: Vec<ApplyResult>,
    /// Whether a new bundle was uploaded. False for a no-change cycle.
    pub uploaded: bool,
    /// Remote file id of the uploaded bundle.
    pub remote_file_id: Option<String>,
    /// New high-water mark after a successful upload (ms epoch).
    pub last_sync_time: Option<i64>,
}

impl SyncReport {
    pub(crate) fn no_change(provider: Provider) -> Self {
        Self {
            provider,
            merged: 0,
            failures: Vec::new(),
            uploaded: false,
            remote_file_id: None,
            last_sync_time: None,
        }
    }
}
