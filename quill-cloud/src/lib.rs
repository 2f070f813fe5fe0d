//! Cloud layer for Quill.
//!
//! Everything between the backup bundle and a third-party storage account:
//! - Durable per-provider OAuth token lifecycle (`TokenStore`)
//! - Sync settings bookkeeping (`SettingsStore`)
//! - Authorization-code + refresh flows (`OAuthFlow`) with Google Drive
//!   and Dropbox configurations
//! - Storage adapters addressing one application-scoped backup slot per
//!   account, composed with the auth flow by `ProviderClient`

pub mod dropbox;
pub mod error;
pub mod google_drive;
pub mod kv;
pub mod oauth;
pub mod provider;
pub mod settings;
pub mod token_store;

pub use error::{CloudError, CloudResult};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use oauth::{AuthState, ConnectOutcome, ConsentLauncher, NativeConsentBroker, OAuthConfig, OAuthFlow};
pub use provider::{ProviderClient, StorageProvider, BACKUP_FILE_NAME};
pub use settings::{AutoSyncInterval, CloudSyncSettings, SettingsStore};
pub use token_store::{CloudTokenInfo, TokenStore};
