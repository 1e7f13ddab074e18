/// Chat domain: membership, message log and the leave/teardown lifecycle.
///
/// Every operation locks the shared connection once and runs its reads and
/// writes in a single transaction, so concurrent requests on the same chat are
/// serialized and never observe a half-applied change.
pub mod lifecycle;
pub mod membership;
pub mod messages;

use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};

pub use lifecycle::{ChatLifecycle, LeaveOutcome};
pub use membership::MembershipLedger;
pub use messages::MessageLog;

pub(crate) fn chat_exists(conn: &Connection, chat_id: i64) -> SqliteResult<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM chats WHERE id = ?1)",
        params![chat_id],
        |row| row.get(0),
    )
}

pub(crate) fn is_member_sync(conn: &Connection, chat_id: i64, user_id: i64) -> SqliteResult<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM chat_members WHERE chat_id = ?1 AND user_id = ?2)",
        params![chat_id, user_id],
        |row| row.get(0),
    )
}

pub(crate) fn member_count(conn: &Connection, chat_id: i64) -> SqliteResult<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM chat_members WHERE chat_id = ?1",
        params![chat_id],
        |row| row.get(0),
    )
}

pub(crate) fn username_of(conn: &Connection, user_id: i64) -> SqliteResult<Option<String>> {
    conn.query_row(
        "SELECT username FROM users WHERE id = ?1",
        params![user_id],
        |row| row.get(0),
    )
    .optional()
}
