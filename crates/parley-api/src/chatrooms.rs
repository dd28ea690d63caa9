use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use parley_types::api::{
    Claims, ConversationEntry, ConversationListResponse, MessageListResponse, MessageResponse,
    SendMessageRequest, StartChatRequest,
};

use crate::conversations::{self, parse_id, parse_sent_at};
use crate::error::{ApiError, ApiResult, join_error};
use crate::state::AppState;

// -- Handlers --

pub async fn send_message(
    State(state): State<AppState>,
    Path(other_user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let message = send_direct(&state, claims.sub, other_user_id, &req.content).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(other_user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let messages = fetch_conversation(&state, claims.sub, other_user_id).await?;
    Ok(Json(messages))
}

pub async fn list_chatrooms(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let list = list_conversations(&state, claims.sub).await?;
    Ok(Json(list))
}

pub async fn start_chat(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<StartChatRequest>,
) -> ApiResult<impl IntoResponse> {
    let entry = start_direct_chat(&state, &req.username).await?;
    Ok(Json(entry))
}

// -- Facade operations --

/// Validate, seal, persist, and echo the decrypted message back to the
/// sender. An unknown counterparty surfaces as `NotFound` from the store's
/// referential layer.
pub async fn send_direct(
    state: &AppState,
    me: Uuid,
    other: Uuid,
    content: &str,
) -> ApiResult<MessageResponse> {
    if content.trim().is_empty() {
        return Err(ApiError::Validation("message content must not be empty".into()));
    }

    let sealed = parley_crypto::seal(&state.cipher_key, content)?;
    let echoed = parley_crypto::open(&state.cipher_key, &sealed)?;

    let db = state.clone();
    let sender = me.to_string();
    let receiver = other.to_string();
    tokio::task::spawn_blocking(move || db.db.insert_direct_message(&sender, &receiver, &sealed))
        .await
        .map_err(join_error)??;

    Ok(MessageResponse {
        id: Uuid::new_v4(),
        from_me: true,
        content: echoed,
        sent_at: None,
    })
}

/// Both directions of the conversation with `other`, decrypted, `from_me`
/// tagged by sender comparison. Direct messages carry no timestamp, so
/// `sent_at` is always null here.
pub async fn fetch_conversation(
    state: &AppState,
    me: Uuid,
    other: Uuid,
) -> ApiResult<MessageListResponse> {
    let db = state.clone();
    let me_s = me.to_string();
    let other_s = other.to_string();
    let rows = tokio::task::spawn_blocking(move || {
        if db.db.get_user_by_id(&other_s)?.is_none() {
            return Err(ApiError::NotFound("user"));
        }
        Ok::<_, ApiError>(db.db.list_between(&me_s, &other_s)?)
    })
    .await
    .map_err(join_error)??;

    let me_s = me.to_string();
    let mut messages = Vec::with_capacity(rows.len());
    for row in rows {
        let content = parley_crypto::open(&state.cipher_key, &row.sealed)?;
        messages.push(MessageResponse {
            id: Uuid::new_v4(),
            from_me: row.senderid == me_s,
            content,
            sent_at: None,
        });
    }

    Ok(MessageListResponse { messages })
}

/// The chat list: deduplicated direct counterparties followed by the user's
/// groups with their latest message.
pub async fn list_conversations(state: &AppState, me: Uuid) -> ApiResult<ConversationListResponse> {
    let db = state.clone();
    let me_s = me.to_string();
    let (direct_rows, group_rows) = tokio::task::spawn_blocking(move || {
        let direct = db.db.list_direct_for_user(&me_s)?;
        let groups = db.db.list_group_conversations(&me_s)?;
        Ok::<_, ApiError>((direct, groups))
    })
    .await
    .map_err(join_error)??;

    let me_s = me.to_string();
    let mut entries = Vec::with_capacity(direct_rows.len() + group_rows.len());

    for chat in conversations::dedupe_direct(&me_s, &direct_rows) {
        let preview = parley_crypto::open(&state.cipher_key, &chat.row.sealed)?;
        entries.push(ConversationEntry {
            id: parse_id(chat.counterparty_id),
            name: chat.counterparty_name.to_string(),
            is_group: false,
            last_message: Some(preview),
            sent_at: None,
        });
    }

    for row in &group_rows {
        let last_message = match &row.last {
            Some(sealed) => Some(parley_crypto::open(&state.cipher_key, sealed)?),
            None => None,
        };
        entries.push(ConversationEntry {
            id: parse_id(&row.groupid),
            name: row.groupname.clone(),
            is_group: true,
            last_message,
            sent_at: row.sent_at.as_deref().map(parse_sent_at),
        });
    }

    Ok(ConversationListResponse { conversations: entries })
}

/// Resolve a username and hand back a zero-message placeholder entry. No row
/// is written: the conversation exists logically before any message, and the
/// chat list picks it up after the first send.
pub async fn start_direct_chat(state: &AppState, username: &str) -> ApiResult<ConversationEntry> {
    let username = username.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::Validation("username must not be empty".into()));
    }

    let db = state.clone();
    let user = tokio::task::spawn_blocking(move || db.db.get_user_by_username(&username))
        .await
        .map_err(join_error)??
        .ok_or(ApiError::NotFound("user"))?;

    Ok(ConversationEntry {
        id: parse_id(&user.userid),
        name: user.username,
        is_group: false,
        last_message: None,
        sent_at: None,
    })
}
