//! Chat-list aggregation: collapse raw direct-message rows into one entry
//! per distinct counterparty.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use parley_db::models::DirectMessageRow;

/// One direct-chat candidate: the counterparty and the row that first
/// mentioned them.
pub struct DirectConversation<'a> {
    pub counterparty_id: &'a str,
    pub counterparty_name: &'a str,
    pub row: &'a DirectMessageRow,
}

/// Collapse a user's direct messages to one entry per distinct counterparty.
///
/// The rows carry no ordering column, so "first occurrence in retrieval
/// order" is the whole policy: the first row mentioning a counterparty wins.
/// Do not change this to last-occurrence — without a timestamp there is no
/// definition of "last", and the first-seen behavior is what stored clients
/// observe today.
pub fn dedupe_direct<'a>(me: &str, rows: &'a [DirectMessageRow]) -> Vec<DirectConversation<'a>> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for row in rows {
        let (id, name) = if row.senderid == me {
            (row.receiverid.as_str(), row.receiver_username.as_str())
        } else {
            (row.senderid.as_str(), row.sender_username.as_str())
        };
        if seen.insert(id) {
            out.push(DirectConversation {
                counterparty_id: id,
                counterparty_name: name,
                row,
            });
        }
    }

    out
}

/// Parse a stored id, falling back to the nil UUID on corrupt data rather
/// than failing the whole listing.
pub(crate) fn parse_id(raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("corrupt id '{raw}': {e}");
        Uuid::default()
    })
}

/// Parse a stored `sent_at`. Rows written by this service are RFC 3339;
/// rows written by SQLite's datetime('now') lack the timezone suffix.
pub(crate) fn parse_sent_at(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("corrupt sent_at '{raw}': {e}");
            DateTime::default()
        })
}
