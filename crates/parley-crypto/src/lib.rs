//! Cipher engine: AES-256-GCM sealing and opening of message bodies under a
//! single process-wide key.
//!
//! Every message gets a fresh random 96-bit IV and the ciphertext is only
//! released after the GCM tag verifies. The at-rest shape is the hex triple
//! `{iv, content, tag}` defined in `parley_types::models::SealedMessage`.

pub mod encrypt;
pub mod keys;

pub use encrypt::{open, seal};
pub use keys::CipherKey;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// GCM tag did not verify: the payload was tampered with, corrupted, or
    /// sealed under a different key. Never downgraded to empty content.
    #[error("message failed authentication")]
    Authentication,

    /// A sealed field is not valid hex or has the wrong length.
    #[error("malformed sealed payload")]
    Malformed,

    /// Key material is not a 256-bit hex string.
    #[error("invalid key material")]
    InvalidKey,

    /// The cipher itself refused to encrypt.
    #[error("encryption failed")]
    Encrypt,
}
