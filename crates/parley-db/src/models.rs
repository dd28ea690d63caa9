//! Database row types — these map directly to SQLite rows.
//! Distinct from the parley-types API models to keep the DB layer
//! independent of the wire format.

use parley_types::models::SealedMessage;

pub struct UserRow {
    pub userid: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

pub struct DirectMessageRow {
    pub senderid: String,
    pub receiverid: String,
    pub sender_username: String,
    pub receiver_username: String,
    pub sealed: SealedMessage,
}

pub struct GroupRow {
    pub groupid: String,
    pub groupname: String,
    pub created_by: String,
    pub created_at: String,
}

pub struct GroupMessageRow {
    pub senderid: String,
    pub sender_username: String,
    pub groupid: String,
    pub sent_at: String,
    pub sealed: SealedMessage,
}

/// One chat-list candidate for a group the user belongs to: the group plus
/// its most recent message, if any exists yet.
pub struct GroupConversationRow {
    pub groupid: String,
    pub groupname: String,
    pub last: Option<SealedMessage>,
    pub sent_at: Option<String>,
}
