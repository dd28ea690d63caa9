use rusqlite::Connection;
use tracing::info;

use crate::StoreResult;

pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            userid      TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Direct messages carry no id and no timestamp. The canonical schema
        -- predates this service; readers must not assume either column, and
        -- the chat list depends on plain scan order, so the table stays
        -- unindexed.
        CREATE TABLE IF NOT EXISTS user_messages (
            senderid    TEXT NOT NULL REFERENCES users(userid),
            receiverid  TEXT NOT NULL REFERENCES users(userid),
            content     TEXT NOT NULL,
            iv          TEXT NOT NULL,
            tag         TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS groups (
            groupid     TEXT PRIMARY KEY,
            groupname   TEXT NOT NULL,
            created_by  TEXT NOT NULL REFERENCES users(userid),
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS group_members (
            groupid     TEXT NOT NULL REFERENCES groups(groupid),
            userid      TEXT NOT NULL REFERENCES users(userid),
            UNIQUE(groupid, userid)
        );

        CREATE TABLE IF NOT EXISTS group_messages (
            senderid    TEXT NOT NULL REFERENCES users(userid),
            groupid     TEXT NOT NULL REFERENCES groups(groupid),
            sent_at     TEXT NOT NULL,
            content     TEXT NOT NULL,
            iv          TEXT NOT NULL,
            tag         TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_group_messages_group
            ON group_messages(groupid, sent_at);
        ",
    )?;

    info!("database migrations complete");
    Ok(())
}
