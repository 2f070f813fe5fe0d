//! Authenticated encryption (ChaCha20-Poly1305).
//!
//! Output layout is `nonce ‖ ciphertext ‖ tag`. The nonce is generated
//! inside [`encrypt`] on every call — there is deliberately no API that
//! accepts a caller-supplied nonce.

use crate::error::{CryptoError, CryptoResult};
use crate::key::DerivedKey;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::{rngs::OsRng, RngCore};

/// Nonce length in bytes (96-bit, fixed by ChaCha20-Poly1305).
pub const NONCE_SIZE: usize = 12;

/// Poly1305 tag length in bytes, appended to the ciphertext by the AEAD.
pub const TAG_SIZE: usize = 16;

/// Encrypts `plaintext`, prepending a freshly generated random nonce.
pub fn encrypt(key: &DerivedKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts a `nonce ‖ ciphertext ‖ tag` blob produced by [`encrypt`].
///
/// A blob shorter than `NONCE_SIZE + TAG_SIZE` can never be valid and is
/// reported as malformed input. Tag verification failure is reported as
/// [`CryptoError::Authentication`] regardless of whether the password was
/// wrong or the data was tampered with.
pub fn decrypt(key: &DerivedKey, blob: &[u8]) -> CryptoResult<Vec<u8>> {
    const MIN_LEN: usize = NONCE_SIZE + TAG_SIZE;
    if blob.len() < MIN_LEN {
        return Err(CryptoError::TruncatedCiphertext {
            len: blob.len(),
            min: MIN_LEN,
        });
    }

    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_SIZE);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CryptoError::Authentication)
}
