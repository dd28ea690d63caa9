use rusqlite::{OptionalExtension, params};

use parley_types::models::SealedMessage;

use crate::models::{
    DirectMessageRow, GroupConversationRow, GroupMessageRow, GroupRow, UserRow,
};
use crate::{Database, StoreResult};

impl Database {
    // -- Users --

    /// Provisioning/test helper. User rows belong to the identity service;
    /// the messaging core only ever reads them.
    pub fn create_user(&self, userid: &str, username: &str, email: &str) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (userid, username, email) VALUES (?1, ?2, ?3)",
                params![userid, username, email],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT userid, username, email, created_at FROM users WHERE username = ?1",
                    [username],
                    user_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_id(&self, userid: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT userid, username, email, created_at FROM users WHERE userid = ?1",
                    [userid],
                    user_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Direct messages --

    /// Single atomic INSERT: the sealed triple and both endpoints land
    /// together or not at all.
    pub fn insert_direct_message(
        &self,
        senderid: &str,
        receiverid: &str,
        sealed: &SealedMessage,
    ) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO user_messages (senderid, receiverid, content, iv, tag)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![senderid, receiverid, sealed.content, sealed.iv, sealed.tag],
            )?;
            Ok(())
        })
    }

    /// Every direct message touching a user, in retrieval order. The table
    /// has no ordering column; callers must not assume any order beyond what
    /// the scan produces. Usernames are joined in up front to avoid N+1
    /// lookups when building the chat list.
    pub fn list_direct_for_user(&self, userid: &str) -> StoreResult<Vec<DirectMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.senderid, m.receiverid, s.username, r.username,
                        m.content, m.iv, m.tag
                 FROM user_messages m
                 JOIN users s ON s.userid = m.senderid
                 JOIN users r ON r.userid = m.receiverid
                 WHERE m.senderid = ?1 OR m.receiverid = ?1",
            )?;
            let rows = stmt
                .query_map([userid], direct_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Both directions of one logical conversation: (a, b) and its mirror.
    pub fn list_between(&self, a: &str, b: &str) -> StoreResult<Vec<DirectMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.senderid, m.receiverid, s.username, r.username,
                        m.content, m.iv, m.tag
                 FROM user_messages m
                 JOIN users s ON s.userid = m.senderid
                 JOIN users r ON r.userid = m.receiverid
                 WHERE (m.senderid = ?1 AND m.receiverid = ?2)
                    OR (m.senderid = ?2 AND m.receiverid = ?1)",
            )?;
            let rows = stmt
                .query_map(params![a, b], direct_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Group messages --

    pub fn insert_group_message(
        &self,
        senderid: &str,
        groupid: &str,
        sent_at: &str,
        sealed: &SealedMessage,
    ) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO group_messages (senderid, groupid, sent_at, content, iv, tag)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![senderid, groupid, sent_at, sealed.content, sealed.iv, sealed.tag],
            )?;
            Ok(())
        })
    }

    /// A group's messages in strict `sent_at` order, oldest first.
    pub fn list_group_messages(&self, groupid: &str) -> StoreResult<Vec<GroupMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.senderid, u.username, m.groupid, m.sent_at,
                        m.content, m.iv, m.tag
                 FROM group_messages m
                 JOIN users u ON u.userid = m.senderid
                 WHERE m.groupid = ?1
                 ORDER BY m.sent_at ASC",
            )?;
            let rows = stmt
                .query_map([groupid], group_message_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Groups & membership --

    /// Create a group and enroll the owner in one transaction: if either
    /// insert fails, neither persists, so a group never exists without at
    /// least one member.
    pub fn create_group(
        &self,
        groupid: &str,
        groupname: &str,
        owner: &str,
        created_at: &str,
    ) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO groups (groupid, groupname, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![groupid, groupname, owner, created_at],
            )?;
            tx.execute(
                "INSERT INTO group_members (groupid, userid) VALUES (?1, ?2)",
                params![groupid, owner],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_group(&self, groupid: &str) -> StoreResult<Option<GroupRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT groupid, groupname, created_by, created_at
                     FROM groups WHERE groupid = ?1",
                    [groupid],
                    |row| {
                        Ok(GroupRow {
                            groupid: row.get(0)?,
                            groupname: row.get(1)?,
                            created_by: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Idempotent: re-adding an existing member is a no-op. An unknown group
    /// or user still fails the foreign key check — OR IGNORE does not cover
    /// referential violations.
    pub fn add_group_member(&self, groupid: &str, userid: &str) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO group_members (groupid, userid) VALUES (?1, ?2)",
                params![groupid, userid],
            )?;
            Ok(())
        })
    }

    /// The authorization predicate for all group reads and writes.
    pub fn is_group_member(&self, groupid: &str, userid: &str) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM group_members WHERE groupid = ?1 AND userid = ?2",
                params![groupid, userid],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// One row per group the user belongs to, joined with the group's most
    /// recent message by `sent_at`. Groups with messages come first, newest
    /// first; message-less groups sort last (SQLite puts NULLs after values
    /// in a DESC order).
    pub fn list_group_conversations(&self, userid: &str) -> StoreResult<Vec<GroupConversationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT g.groupid, g.groupname, gm.content, gm.iv, gm.tag, gm.sent_at
                 FROM groups g
                 JOIN group_members mem ON mem.groupid = g.groupid AND mem.userid = ?1
                 LEFT JOIN group_messages gm ON gm.rowid = (
                     SELECT m.rowid FROM group_messages m
                     WHERE m.groupid = g.groupid
                     ORDER BY m.sent_at DESC LIMIT 1
                 )
                 ORDER BY gm.sent_at DESC",
            )?;
            let rows = stmt
                .query_map([userid], group_conversation_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        userid: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn direct_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DirectMessageRow> {
    Ok(DirectMessageRow {
        senderid: row.get(0)?,
        receiverid: row.get(1)?,
        sender_username: row.get(2)?,
        receiver_username: row.get(3)?,
        sealed: SealedMessage {
            content: row.get(4)?,
            iv: row.get(5)?,
            tag: row.get(6)?,
        },
    })
}

fn group_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GroupMessageRow> {
    Ok(GroupMessageRow {
        senderid: row.get(0)?,
        sender_username: row.get(1)?,
        groupid: row.get(2)?,
        sent_at: row.get(3)?,
        sealed: SealedMessage {
            content: row.get(4)?,
            iv: row.get(5)?,
            tag: row.get(6)?,
        },
    })
}

fn group_conversation_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GroupConversationRow> {
    let content: Option<String> = row.get(2)?;
    let iv: Option<String> = row.get(3)?;
    let tag: Option<String> = row.get(4)?;
    let last = match (content, iv, tag) {
        (Some(content), Some(iv), Some(tag)) => Some(SealedMessage { iv, content, tag }),
        _ => None,
    };
    Ok(GroupConversationRow {
        groupid: row.get(0)?,
        groupname: row.get(1)?,
        last,
        sent_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;

    fn db_with_users() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "alice", "alice@example.com").unwrap();
        db.create_user("u2", "bob", "bob@example.com").unwrap();
        db.create_user("u3", "carol", "carol@example.com").unwrap();
        db
    }

    fn sealed(marker: &str) -> SealedMessage {
        SealedMessage {
            iv: "00".repeat(12),
            content: hex::encode(marker),
            tag: "00".repeat(16),
        }
    }

    fn membership_count(db: &Database, groupid: &str, userid: &str) -> i64 {
        db.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM group_members WHERE groupid = ?1 AND userid = ?2",
                params![groupid, userid],
                |row| row.get(0),
            )?;
            Ok(n)
        })
        .unwrap()
    }

    #[test]
    fn direct_messages_roundtrip_between_pair() {
        let db = db_with_users();
        db.insert_direct_message("u1", "u2", &sealed("one")).unwrap();
        db.insert_direct_message("u2", "u1", &sealed("two")).unwrap();
        db.insert_direct_message("u1", "u3", &sealed("other")).unwrap();

        let rows = db.list_between("u1", "u2").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].senderid, "u1");
        assert_eq!(rows[0].sender_username, "alice");
        assert_eq!(rows[0].receiver_username, "bob");
        assert_eq!(rows[1].senderid, "u2");

        // mirror pair sees the same conversation
        let mirrored = db.list_between("u2", "u1").unwrap();
        assert_eq!(mirrored.len(), 2);
    }

    #[test]
    fn list_direct_for_user_sees_both_directions() {
        let db = db_with_users();
        db.insert_direct_message("u1", "u2", &sealed("a")).unwrap();
        db.insert_direct_message("u3", "u2", &sealed("b")).unwrap();
        db.insert_direct_message("u2", "u1", &sealed("c")).unwrap();

        let rows = db.list_direct_for_user("u2").unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn unknown_receiver_is_not_found() {
        let db = db_with_users();
        let err = db
            .insert_direct_message("u1", "ghost", &sealed("x"))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        assert!(db.list_direct_for_user("u1").unwrap().is_empty());
    }

    #[test]
    fn create_group_enrolls_owner() {
        let db = db_with_users();
        db.create_group("g1", "lunch", "u1", "2026-08-07T10:00:00Z")
            .unwrap();

        assert!(db.is_group_member("g1", "u1").unwrap());
        assert!(!db.is_group_member("g1", "u2").unwrap());
        assert_eq!(db.get_group("g1").unwrap().unwrap().groupname, "lunch");
    }

    #[test]
    fn create_group_with_unknown_owner_persists_nothing() {
        let db = db_with_users();
        let err = db
            .create_group("g1", "lunch", "ghost", "2026-08-07T10:00:00Z")
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        assert!(db.get_group("g1").unwrap().is_none());
        assert_eq!(membership_count(&db, "g1", "ghost"), 0);
    }

    #[test]
    fn add_member_is_idempotent() {
        let db = db_with_users();
        db.create_group("g1", "lunch", "u1", "2026-08-07T10:00:00Z")
            .unwrap();

        db.add_group_member("g1", "u2").unwrap();
        db.add_group_member("g1", "u2").unwrap();

        assert_eq!(membership_count(&db, "g1", "u2"), 1);
    }

    #[test]
    fn add_member_to_unknown_group_is_not_found() {
        let db = db_with_users();
        let err = db.add_group_member("ghost", "u1").unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn group_messages_come_back_in_sent_at_order() {
        let db = db_with_users();
        db.create_group("g1", "lunch", "u1", "2026-08-07T10:00:00Z")
            .unwrap();
        db.add_group_member("g1", "u2").unwrap();

        db.insert_group_message("u2", "g1", "2026-08-07T12:00:00Z", &sealed("late"))
            .unwrap();
        db.insert_group_message("u1", "g1", "2026-08-07T11:00:00Z", &sealed("early"))
            .unwrap();

        let rows = db.list_group_messages("g1").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sent_at, "2026-08-07T11:00:00Z");
        assert_eq!(rows[0].sender_username, "alice");
        assert_eq!(rows[1].sent_at, "2026-08-07T12:00:00Z");
    }

    #[test]
    fn group_conversations_pick_latest_message_and_keep_empty_groups() {
        let db = db_with_users();
        db.create_group("g1", "busy", "u1", "2026-08-07T10:00:00Z")
            .unwrap();
        db.create_group("g2", "quiet", "u1", "2026-08-07T10:00:00Z")
            .unwrap();
        db.create_group("g3", "other", "u2", "2026-08-07T10:00:00Z")
            .unwrap();

        db.insert_group_message("u1", "g1", "2026-08-07T11:00:00Z", &sealed("old"))
            .unwrap();
        db.insert_group_message("u1", "g1", "2026-08-07T12:00:00Z", &sealed("new"))
            .unwrap();

        let rows = db.list_group_conversations("u1").unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].groupid, "g1");
        assert_eq!(
            rows[0].last.as_ref().unwrap().content,
            sealed("new").content
        );
        assert_eq!(rows[0].sent_at.as_deref(), Some("2026-08-07T12:00:00Z"));

        // message-less group still shows up, after the active one
        assert_eq!(rows[1].groupid, "g2");
        assert!(rows[1].last.is_none());
        assert!(rows[1].sent_at.is_none());
    }
}
