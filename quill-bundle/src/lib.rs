//! Backup bundle format for Quill.
//!
//! A bundle is the single artifact a backup ships as:
//!
//! ```text
//! [4-byte BE length][metadata JSON][nonce ‖ ciphertext ‖ tag]
//! ```
//!
//! The metadata travels unencrypted so a bundle can be previewed — record
//! counts, creation date — without prompting for the password. Everything
//! after the metadata is opaque authenticated ciphertext produced by
//! `quill-crypto`.

mod backup;
mod codec;
mod error;
mod metadata;

pub use backup::{create_bundle, extract_bundle};
pub use codec::{pack, read_metadata, unpack, LENGTH_PREFIX_SIZE};
pub use error::{BundleError, BundleResult};
pub use metadata::{BundleMetadata, ENCRYPTION_ALGORITHM, FORMAT_VERSION};
