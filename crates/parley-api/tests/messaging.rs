//! Facade-level tests: the full send/fetch/list flows against an in-memory
//! database, exercising encryption, authorization and aggregation together.

use std::sync::Arc;

use uuid::Uuid;

use parley_api::chatrooms;
use parley_api::error::ApiError;
use parley_api::groups;
use parley_api::state::{AppState, AppStateInner};
use parley_crypto::CipherKey;
use parley_db::Database;
use parley_types::api::Claims;

fn state() -> AppState {
    Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        cipher_key: CipherKey::generate(),
        jwt_secret: "test-secret".into(),
    })
}

fn seed_user(state: &AppState, username: &str) -> Uuid {
    let id = Uuid::new_v4();
    state
        .db
        .create_user(&id.to_string(), username, &format!("{username}@example.com"))
        .unwrap();
    id
}

fn claims(sub: Uuid, username: &str) -> Claims {
    Claims {
        sub,
        username: username.into(),
        exp: 0,
    }
}

#[tokio::test]
async fn direct_message_round_trips_through_both_sides() {
    let state = state();
    let alice = seed_user(&state, "alice");
    let bob = seed_user(&state, "bob");

    let echo = chatrooms::send_direct(&state, alice, bob, "hello")
        .await
        .unwrap();
    assert!(echo.from_me);
    assert_eq!(echo.content, "hello");
    assert!(echo.sent_at.is_none());

    // the stored row is ciphertext, not the plaintext
    let rows = state
        .db
        .list_between(&alice.to_string(), &bob.to_string())
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_ne!(hex::decode(&rows[0].sealed.content).unwrap(), b"hello");

    let from_alice = chatrooms::fetch_conversation(&state, alice, bob).await.unwrap();
    assert_eq!(from_alice.messages.len(), 1);
    assert!(from_alice.messages[0].from_me);
    assert_eq!(from_alice.messages[0].content, "hello");

    let from_bob = chatrooms::fetch_conversation(&state, bob, alice).await.unwrap();
    assert_eq!(from_bob.messages.len(), 1);
    assert!(!from_bob.messages[0].from_me);
    assert_eq!(from_bob.messages[0].content, "hello");
}

#[tokio::test]
async fn empty_content_is_rejected_before_any_write() {
    let state = state();
    let alice = seed_user(&state, "alice");
    let bob = seed_user(&state, "bob");

    for content in ["", "   "] {
        let err = chatrooms::send_direct(&state, alice, bob, content)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    let rows = state
        .db
        .list_between(&alice.to_string(), &bob.to_string())
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn sending_to_unknown_user_is_not_found() {
    let state = state();
    let alice = seed_user(&state, "alice");

    let err = chatrooms::send_direct(&state, alice, Uuid::new_v4(), "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn chat_list_keeps_first_occurrence_per_counterparty() {
    let state = state();
    let alice = seed_user(&state, "alice");
    let bob = seed_user(&state, "bob");
    let carol = seed_user(&state, "carol");

    chatrooms::send_direct(&state, alice, bob, "first").await.unwrap();
    chatrooms::send_direct(&state, carol, bob, "from carol").await.unwrap();
    chatrooms::send_direct(&state, alice, bob, "later").await.unwrap();

    let list = chatrooms::list_conversations(&state, bob).await.unwrap();
    assert_eq!(list.conversations.len(), 2);

    let with_alice = &list.conversations[0];
    assert_eq!(with_alice.id, alice);
    assert_eq!(with_alice.name, "alice");
    assert!(!with_alice.is_group);
    // first-seen wins: the preview is the oldest row's content, by policy
    assert_eq!(with_alice.last_message.as_deref(), Some("first"));

    let with_carol = &list.conversations[1];
    assert_eq!(with_carol.id, carol);
    assert_eq!(with_carol.last_message.as_deref(), Some("from carol"));
}

#[tokio::test]
async fn start_chat_returns_placeholder_without_writing() {
    let state = state();
    let _alice = seed_user(&state, "alice");
    let bob = seed_user(&state, "bob");

    let entry = chatrooms::start_direct_chat(&state, "bob").await.unwrap();
    assert_eq!(entry.id, bob);
    assert_eq!(entry.name, "bob");
    assert!(!entry.is_group);
    assert!(entry.last_message.is_none());

    let err = chatrooms::start_direct_chat(&state, "nobody").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let rows = state.db.list_direct_for_user(&bob.to_string()).unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn group_flow_send_fetch_and_chat_list() {
    let state = state();
    let alice = seed_user(&state, "alice");
    let bob = seed_user(&state, "bob");

    let group = groups::create(&state, alice, "lunch crew").await.unwrap();
    groups::add(&state, group.groupid, bob).await.unwrap();

    let echo = groups::send(&state, &claims(alice, "alice"), group.groupid, "anyone hungry?")
        .await
        .unwrap();
    assert!(echo.from_me);
    assert_eq!(echo.content, "anyone hungry?");

    groups::send(&state, &claims(bob, "bob"), group.groupid, "starving")
        .await
        .unwrap();

    let fetched = groups::fetch_messages(&state, alice, group.groupid).await.unwrap();
    assert_eq!(fetched.messages.len(), 2);
    assert_eq!(fetched.messages[0].content, "anyone hungry?");
    assert!(fetched.messages[0].from_me);
    assert_eq!(fetched.messages[0].sender_username, "alice");
    assert_eq!(fetched.messages[1].content, "starving");
    assert!(!fetched.messages[1].from_me);
    assert_eq!(fetched.messages[1].sender_username, "bob");
    assert!(fetched.messages[0].sent_at <= fetched.messages[1].sent_at);

    let list = chatrooms::list_conversations(&state, alice).await.unwrap();
    assert_eq!(list.conversations.len(), 1);
    let entry = &list.conversations[0];
    assert_eq!(entry.id, group.groupid);
    assert_eq!(entry.name, "lunch crew");
    assert!(entry.is_group);
    assert_eq!(entry.last_message.as_deref(), Some("starving"));
    assert!(entry.sent_at.is_some());
}

#[tokio::test]
async fn non_members_are_rejected_and_nothing_persists() {
    let state = state();
    let alice = seed_user(&state, "alice");
    let carol = seed_user(&state, "carol");

    let group = groups::create(&state, alice, "private").await.unwrap();

    let err = groups::fetch_messages(&state, carol, group.groupid).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));

    let err = groups::send(&state, &claims(carol, "carol"), group.groupid, "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));

    let fetched = groups::fetch_messages(&state, alice, group.groupid).await.unwrap();
    assert!(fetched.messages.is_empty());
}

#[tokio::test]
async fn unknown_group_is_not_found() {
    let state = state();
    let alice = seed_user(&state, "alice");

    let err = groups::fetch_messages(&state, alice, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn adding_a_member_twice_leaves_one_row() {
    let state = state();
    let alice = seed_user(&state, "alice");
    let bob = seed_user(&state, "bob");

    let group = groups::create(&state, alice, "lunch").await.unwrap();
    groups::add(&state, group.groupid, bob).await.unwrap();
    groups::add(&state, group.groupid, bob).await.unwrap();

    let count: i64 = state
        .db
        .with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM group_members WHERE groupid = ?1 AND userid = ?2",
                rusqlite::params![group.groupid.to_string(), bob.to_string()],
                |row| row.get(0),
            )?;
            Ok(n)
        })
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn tampered_storage_surfaces_authentication_failure() {
    let state = state();
    let alice = seed_user(&state, "alice");
    let bob = seed_user(&state, "bob");

    chatrooms::send_direct(&state, alice, bob, "hello").await.unwrap();

    state
        .db
        .with_conn_mut(|conn| {
            conn.execute("UPDATE user_messages SET tag = ?1", ["00".repeat(16)])?;
            Ok(())
        })
        .unwrap();

    let err = chatrooms::fetch_conversation(&state, alice, bob).await.unwrap_err();
    assert!(matches!(err, ApiError::AuthenticationFailure));
}
