use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, OsRng, rand_core::RngCore},
};

use parley_types::models::SealedMessage;

use crate::{CipherError, keys::CipherKey};

/// IV length in bytes (96-bit, the GCM standard nonce size).
pub const IV_LEN: usize = 12;

/// GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Encrypt a plaintext with AES-256-GCM under a fresh 96-bit IV.
///
/// The IV is drawn from the OS RNG on every call. Reusing an IV under the
/// same key breaks confidentiality, so there is deliberately no way to
/// supply or cache one.
pub fn seal(key: &CipherKey, plaintext: &str) -> Result<SealedMessage, CipherError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    let nonce = Nonce::from_slice(&iv);

    let mut sealed = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| CipherError::Encrypt)?;

    // aes-gcm appends the 16-byte tag to the ciphertext; stored data keeps
    // the tag as its own field, so split it back off.
    let tag = sealed.split_off(sealed.len() - TAG_LEN);

    Ok(SealedMessage {
        iv: hex::encode(iv),
        content: hex::encode(sealed),
        tag: hex::encode(tag),
    })
}

/// Decrypt a sealed message. The tag is verified before any plaintext is
/// produced; a mismatch (tampering, wrong key) is a hard failure, never
/// garbage text.
pub fn open(key: &CipherKey, sealed: &SealedMessage) -> Result<String, CipherError> {
    let iv = decode_field(&sealed.iv, Some(IV_LEN))?;
    let mut ciphertext = decode_field(&sealed.content, None)?;
    let tag = decode_field(&sealed.tag, Some(TAG_LEN))?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    ciphertext.extend_from_slice(&tag);

    let plaintext = cipher
        .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
        .map_err(|_| CipherError::Authentication)?;

    String::from_utf8(plaintext).map_err(|_| CipherError::Authentication)
}

fn decode_field(encoded: &str, expected_len: Option<usize>) -> Result<Vec<u8>, CipherError> {
    let bytes = hex::decode(encoded).map_err(|_| CipherError::Malformed)?;
    if expected_len.is_some_and(|len| bytes.len() != len) {
        return Err(CipherError::Malformed);
    }
    Ok(bytes)
}
