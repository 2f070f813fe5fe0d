//! Journal record model.
//!
//! Records use camelCase field names on the wire — the exported JSON is
//! shared with the mobile clients, which expect that convention.

use serde::{Deserialize, Serialize};

/// A single journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub title: String,
    pub body: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl JournalEntry {
    /// Creates a new entry with a fresh id and both timestamps set to `now`.
    pub fn new(title: impl Into<String>, body: impl Into<String>, now: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            folder_id: None,
            tags: Vec::new(),
            title: title.into(),
            body: body.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A folder grouping journal entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A user-defined tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Full export of the local journal: everything a backup contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSet {
    #[serde(default)]
    pub entries: Vec<JournalEntry>,
    #[serde(default)]
    pub folders: Vec<Folder>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl RecordSet {
    pub fn counts(&self) -> RecordCounts {
        RecordCounts {
            entries: self.entries.len() as u32,
            folders: self.folders.len() as u32,
            tags: self.tags.len() as u32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.folders.is_empty() && self.tags.is_empty()
    }

    /// Total number of records across all kinds.
    pub fn len(&self) -> usize {
        self.entries.len() + self.folders.len() + self.tags.len()
    }
}

/// Per-kind record counts, shown in backup previews.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordCounts {
    pub entries: u32,
    pub folders: u32,
    pub tags: u32,
}
