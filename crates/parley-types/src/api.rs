use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// Claims minted by the identity service and verified by the API middleware.
/// `sub` is the authenticated caller; the messaging core trusts it
/// unconditionally once the signature checks out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
}

/// A delivered (decrypted) message. `id` is minted per delivery — the
/// underlying tables carry no identity column. `sent_at` is null for direct
/// messages, which have no timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Uuid,
    pub from_me: bool,
    pub content: String,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Group deliveries additionally carry the sender's display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessageResponse {
    pub id: Uuid,
    pub from_me: bool,
    pub sender_username: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

/// Fixed wrapper for message lists. Clients must not have to guess between
/// a bare array and an object envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageListResponse {
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupMessageListResponse {
    pub messages: Vec<GroupMessageResponse>,
}

// -- Chat list --

/// One row of the chat list: a direct counterparty or a group, tagged by
/// `is_group`. `last_message` is the decrypted preview; both it and
/// `sent_at` are absent for conversations with no messages yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEntry {
    pub id: Uuid,
    pub name: String,
    pub is_group: bool,
    pub last_message: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartChatRequest {
    pub username: String,
}

// -- Groups --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub groupname: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub groupid: Uuid,
    pub groupname: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddMemberRequest {
    pub userid: Uuid,
}
