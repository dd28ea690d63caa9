use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use parley_db::Database;
use parley_types::api::{
    AddMemberRequest, Claims, CreateGroupRequest, GroupMessageListResponse, GroupMessageResponse,
    GroupResponse, SendMessageRequest,
};

use crate::conversations::parse_sent_at;
use crate::error::{ApiError, ApiResult, join_error};
use crate::state::AppState;

// -- Handlers --

pub async fn create_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGroupRequest>,
) -> ApiResult<impl IntoResponse> {
    let group = create(&state, claims.sub, &req.groupname).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn add_member(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<impl IntoResponse> {
    add(&state, group_id, req.userid).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_group_messages(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let messages = fetch_messages(&state, claims.sub, group_id).await?;
    Ok(Json(messages))
}

pub async fn send_group_message(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let message = send(&state, &claims, group_id, &req.content).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

// -- Facade operations --

/// Create a group owned by the caller. The store enrolls the owner in the
/// same transaction, so the group is never visible without a member.
pub async fn create(state: &AppState, owner: Uuid, groupname: &str) -> ApiResult<GroupResponse> {
    let groupname = groupname.trim();
    if groupname.is_empty() {
        return Err(ApiError::Validation("group name must not be empty".into()));
    }

    let groupid = Uuid::new_v4();
    let created_at = Utc::now();

    let db = state.clone();
    let name = groupname.to_string();
    let gid = groupid.to_string();
    let owner_s = owner.to_string();
    let stamp = created_at.to_rfc3339();
    tokio::task::spawn_blocking(move || db.db.create_group(&gid, &name, &owner_s, &stamp))
        .await
        .map_err(join_error)??;

    Ok(GroupResponse {
        groupid,
        groupname: groupname.to_string(),
        created_by: owner,
        created_at,
    })
}

/// Enroll a user; re-adding an existing member is a no-op. Unknown group or
/// user surfaces as `NotFound` from the referential layer.
pub async fn add(state: &AppState, group_id: Uuid, userid: Uuid) -> ApiResult<()> {
    let db = state.clone();
    let gid = group_id.to_string();
    let uid = userid.to_string();
    tokio::task::spawn_blocking(move || db.db.add_group_member(&gid, &uid))
        .await
        .map_err(join_error)??;
    Ok(())
}

/// Membership-gated send: authorize, then seal, then persist — a non-member
/// never causes a write. The echo carries the server timestamp recorded in
/// the row.
pub async fn send(
    state: &AppState,
    claims: &Claims,
    group_id: Uuid,
    content: &str,
) -> ApiResult<GroupMessageResponse> {
    if content.trim().is_empty() {
        return Err(ApiError::Validation("message content must not be empty".into()));
    }

    let sent_at = Utc::now();

    let db = state.clone();
    let key = state.cipher_key.clone();
    let sender = claims.sub.to_string();
    let gid = group_id.to_string();
    let stamp = sent_at.to_rfc3339();
    let body = content.to_string();
    let echoed = tokio::task::spawn_blocking(move || -> ApiResult<String> {
        require_membership(&db.db, &gid, &sender)?;
        let sealed = parley_crypto::seal(&key, &body)?;
        let echoed = parley_crypto::open(&key, &sealed)?;
        db.db.insert_group_message(&sender, &gid, &stamp, &sealed)?;
        Ok(echoed)
    })
    .await
    .map_err(join_error)??;

    Ok(GroupMessageResponse {
        id: Uuid::new_v4(),
        from_me: true,
        sender_username: claims.username.clone(),
        content: echoed,
        sent_at,
    })
}

/// Membership-gated read: the group's messages in strict `sent_at` order,
/// decrypted, with each sender's display name attached.
pub async fn fetch_messages(
    state: &AppState,
    me: Uuid,
    group_id: Uuid,
) -> ApiResult<GroupMessageListResponse> {
    let db = state.clone();
    let key = state.cipher_key.clone();
    let uid = me.to_string();
    let gid = group_id.to_string();
    let messages = tokio::task::spawn_blocking(move || -> ApiResult<Vec<GroupMessageResponse>> {
        require_membership(&db.db, &gid, &uid)?;
        let rows = db.db.list_group_messages(&gid)?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let content = parley_crypto::open(&key, &row.sealed)?;
            out.push(GroupMessageResponse {
                id: Uuid::new_v4(),
                from_me: row.senderid == uid,
                sender_username: row.sender_username,
                content,
                sent_at: parse_sent_at(&row.sent_at),
            });
        }
        Ok(out)
    })
    .await
    .map_err(join_error)??;

    Ok(GroupMessageListResponse { messages })
}

/// Authorization gate for all group reads and writes: the group must exist
/// and the caller must be enrolled. Message history grants nothing.
fn require_membership(db: &Database, groupid: &str, userid: &str) -> ApiResult<()> {
    if db.get_group(groupid)?.is_none() {
        return Err(ApiError::NotFound("group"));
    }
    if !db.is_group_member(groupid, userid)? {
        return Err(ApiError::Unauthorized);
    }
    Ok(())
}
