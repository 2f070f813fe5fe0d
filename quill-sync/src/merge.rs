//! Conflict policy: last-writer-wins per record.
//!
//! Records are keyed by id; when both sides hold the same id, the greater
//! `updated_at` wins. Ties keep the local copy (nothing to apply).
//! Deletions do not propagate — the policy only handles create/update.

use quill_types::RecordSet;
use std::collections::HashMap;

/// Selects the remote records that must be applied locally: those absent
/// from the local set, or strictly newer than the local copy.
pub fn remote_winners(local: &RecordSet, remote: &RecordSet) -> RecordSet {
    let local_entries: HashMap<&str, i64> = local
        .entries
        .iter()
        .map(|r| (r.id.as_str(), r.updated_at))
        .collect();
    let local_folders: HashMap<&str, i64> = local
        .folders
        .iter()
        .map(|r| (r.id.as_str(), r.updated_at))
        .collect();
    let local_tags: HashMap<&str, i64> = local
        .tags
        .iter()
        .map(|r| (r.id.as_str(), r.updated_at))
        .collect();

    let wins = |known: &HashMap<&str, i64>, id: &str, updated_at: i64| match known.get(id) {
        Some(&local_updated) => updated_at > local_updated,
        None => true,
    };

    RecordSet {
        entries: remote
            .entries
            .iter()
            .filter(|r| wins(&local_entries, &r.id, r.updated_at))
            .cloned()
            .collect(),
        folders: remote
            .folders
            .iter()
            .filter(|r| wins(&local_folders, &r.id, r.updated_at))
            .cloned()
            .collect(),
        tags: remote
            .tags
            .iter()
            .filter(|r| wins(&local_tags, &r.id, r.updated_at))
            .cloned()
            .collect(),
    }
}
