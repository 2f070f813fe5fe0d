//! Storage provider identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a third-party storage account a backup lives in.
///
/// Closed enumeration — adding a provider means adding an adapter pair
/// (auth flow + storage) in `quill-cloud`, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    GoogleDrive,
    Dropbox,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::GoogleDrive, Provider::Dropbox];

    /// Stable key used for storage namespacing and log lines.
    pub fn key(&self) -> &'static str {
        match self {
            Provider::GoogleDrive => "google_drive",
            Provider::Dropbox => "dropbox",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::GoogleDrive => write!(f, "Google Drive"),
            Provider::Dropbox => write!(f, "Dropbox"),
        }
    }
}
