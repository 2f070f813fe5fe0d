//! Binary framing: length-prefixed metadata followed by raw ciphertext.

use crate::error::{BundleError, BundleResult};
use crate::metadata::BundleMetadata;

/// Size of the big-endian metadata length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest metadata size the 4-byte prefix may carry. The prefix is
/// unsigned on the wire but readers in signed-integer languages must never
/// see the high bit set.
const MAX_METADATA_SIZE: usize = i32::MAX as usize;

/// Encodes a bundle: `[u32 BE length][metadata JSON][ciphertext]`.
pub fn pack(metadata: &BundleMetadata, ciphertext: &[u8]) -> BundleResult<Vec<u8>> {
    let json = serde_json::to_vec(metadata)
        .map_err(|e| BundleError::MalformedMetadata(e.to_string()))?;

    if json.len() > MAX_METADATA_SIZE {
        return Err(BundleError::MetadataTooLarge { size: json.len() });
    }

    let mut out = Vec::with_capacity(LENGTH_PREFIX_SIZE + json.len() + ciphertext.len());
    out.extend_from_slice(&(json.len() as u32).to_be_bytes());
    out.extend_from_slice(&json);
    out.extend_from_slice(ciphertext);
    Ok(out)
}

/// Decodes a bundle into its metadata and ciphertext region.
///
/// Error kinds are distinct: fewer than 4 bytes is `Truncated`; a declared
/// length of zero or one that leaves no ciphertext is `InvalidLength`; a
/// metadata slice that is not JSON matching the schema is
/// `MalformedMetadata`.
pub fn unpack(bytes: &[u8]) -> BundleResult<(BundleMetadata, &[u8])> {
    if bytes.len() < LENGTH_PREFIX_SIZE {
        return Err(BundleError::Truncated { len: bytes.len() });
    }

    let declared = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let remaining = bytes.len() - LENGTH_PREFIX_SIZE;

    if declared == 0 || declared as usize >= remaining {
        return Err(BundleError::InvalidLength {
            declared,
            total: bytes.len(),
        });
    }

    let metadata_end = LENGTH_PREFIX_SIZE + declared as usize;
    let metadata: BundleMetadata = serde_json::from_slice(&bytes[LENGTH_PREFIX_SIZE..metadata_end])
        .map_err(|e| BundleError::MalformedMetadata(e.to_string()))?;

    Ok((metadata, &bytes[metadata_end..]))
}

/// Reads only the metadata, for previewing a bundle without a password.
/// Never inspects the ciphertext region.
pub fn read_metadata(bytes: &[u8]) -> BundleResult<BundleMetadata> {
    let (metadata, _) = unpack(bytes)?;
    Ok(metadata)
}
