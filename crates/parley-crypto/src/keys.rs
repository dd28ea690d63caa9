use aes_gcm::aead::OsRng;
use aes_gcm::aead::rand_core::RngCore;

use crate::CipherError;

/// Process-wide AES-256-GCM key. Loaded once at startup from configuration
/// and read-only afterwards; rotation requires a restart.
#[derive(Clone)]
pub struct CipherKey([u8; 32]);

impl CipherKey {
    /// Generate a fresh random key (operational tooling and tests).
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Parse a key from its 64-char hex representation.
    pub fn from_hex(encoded: &str) -> Result<Self, CipherError> {
        let bytes = hex::decode(encoded.trim()).map_err(|_| CipherError::InvalidKey)?;
        let key: [u8; 32] = bytes.try_into().map_err(|_| CipherError::InvalidKey)?;
        Ok(Self(key))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

// Redacted so the key can never leak through a log line or panic message.
impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CipherKey(..)")
    }
}
