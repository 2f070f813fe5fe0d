//! High-level bundle operations: create and extract.

use crate::codec::{pack, unpack};
use crate::error::{BundleError, BundleResult};
use crate::metadata::BundleMetadata;
use quill_crypto::{decrypt, derive_key, encrypt, Salt};
use quill_types::{now_millis, RecordCounts};

/// Encrypts a journal export into a complete bundle.
///
/// A fresh salt is generated per bundle — the same payload encrypted twice
/// never shares key material.
pub fn create_bundle(
    payload_json: &str,
    counts: RecordCounts,
    app_version: &str,
    password: &str,
) -> BundleResult<Vec<u8>> {
    let salt = Salt::random();
    let key = derive_key(password, &salt)?;
    let ciphertext = encrypt(&key, payload_json.as_bytes())?;
    let metadata = BundleMetadata::new(counts, &salt, app_version, now_millis());
    pack(&metadata, &ciphertext)
}

/// Decrypts a bundle back into the journal export JSON.
///
/// Framing problems surface as [`BundleError`] kinds; a wrong password or
/// tampered ciphertext surfaces as
/// [`quill_crypto::CryptoError::Authentication`] through the `Crypto`
/// variant.
pub fn extract_bundle(bytes: &[u8], password: &str) -> BundleResult<String> {
    let (metadata, ciphertext) = unpack(bytes)?;
    let salt = metadata.salt()?;
    let key = derive_key(password, &salt)?;
    let plaintext = decrypt(&key, ciphertext)?;
    String::from_utf8(plaintext)
        .map_err(|_| BundleError::Payload("decrypted payload is not valid UTF-8".to_string()))
}
