//! Encryption layer for Quill backups.
//!
//! Provides the two primitives the backup pipeline is built on:
//! - PBKDF2-HMAC-SHA256 key derivation from the user's sync password
//! - ChaCha20-Poly1305 authenticated encryption
//!
//! Keys are derived fresh for every encrypt/decrypt call and zeroized on
//! drop — nothing derived from the password is ever persisted. Nonces are
//! generated inside `encrypt` and prepended to the ciphertext, so a blob
//! is decryptable from the key alone and nonce reuse is impossible by
//! construction.

mod cipher;
mod error;
mod key;

pub use cipher::{decrypt, encrypt, NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use key::{derive_key, DerivedKey, Salt, KEY_SIZE, PBKDF2_ITERATIONS, SALT_SIZE};
