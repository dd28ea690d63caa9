use serde::{Deserialize, Serialize};

/// One encrypted message at rest: hex-encoded IV, ciphertext and GCM tag.
///
/// The three fields are written and read together as a single unit — a row
/// either has all of them or does not exist. This exact shape is shared with
/// already-stored data and must not change without a data migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedMessage {
    pub iv: String,
    pub content: String,
    pub tag: String,
}
