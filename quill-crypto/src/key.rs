//! Password-based key derivation.

use crate::error::{CryptoError, CryptoResult};
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Derived key length in bytes (256-bit).
pub const KEY_SIZE: usize = 32;

/// Salt length in bytes. Fixed — the bundle format embeds exactly this many.
pub const SALT_SIZE: usize = 16;

/// PBKDF2 iteration count. A named constant rather than a tunable so the
/// threat model stays uniform across clients.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// A random per-bundle KDF salt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// Generates a fresh salt from the OS CSPRNG.
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(slice: &[u8]) -> CryptoResult<Self> {
        if slice.len() != SALT_SIZE {
            return Err(CryptoError::InvalidSaltLength {
                expected: SALT_SIZE,
                actual: slice.len(),
            });
        }
        let mut bytes = [0u8; SALT_SIZE];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

/// A 256-bit key derived from a password. Zeroized on drop; never
/// serialized or persisted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_SIZE]);

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Derives a 256-bit key from a password and salt.
///
/// PBKDF2-HMAC-SHA256 with [`PBKDF2_ITERATIONS`] rounds. Deterministic:
/// the same password and salt always yield the same key.
pub fn derive_key(password: &str, salt: &Salt) -> CryptoResult<DerivedKey> {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        salt.as_bytes(),
        PBKDF2_ITERATIONS,
        &mut key,
    );
    Ok(DerivedKey(key))
}
