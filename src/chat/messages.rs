/// Append-only message log, scoped per chat and readable only by members.
///
/// Ordering: each message gets `created_at = max(now, previous created_at)` and
/// `seq = previous seq + 1` within its chat, so (created_at, seq) is a total
/// order even when the wall clock stalls or steps backwards.
use chrono::{DateTime, Utc};
use rusqlite::{
    params, Connection, OptionalExtension, Result as SqliteResult, Row, TransactionBehavior,
};

use super::{chat_exists, is_member_sync};
use crate::db::models::{Message, MessageKind};
use crate::db::DbPool;
use crate::error::LogError;

const MESSAGE_COLUMNS: &str = "id, chat_id, sender_id, content, kind, created_at, seq";

fn message_from_row(row: &Row<'_>) -> SqliteResult<Message> {
    let kind: String = row.get(4)?;
    let created_micros: i64 = row.get(5)?;

    Ok(Message {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        sender_id: row.get(2)?,
        content: row.get(3)?,
        kind: kind.parse().unwrap_or(MessageKind::User),
        created_at: DateTime::from_timestamp_micros(created_micros).unwrap_or_default(),
        seq: row.get(6)?,
    })
}

/// Insert a message, assigning its timestamp and per-chat sequence number.
/// Caller has already checked that the chat exists.
fn insert_message(
    conn: &Connection,
    chat_id: i64,
    sender_id: i64,
    content: &str,
    kind: MessageKind,
) -> SqliteResult<Message> {
    let last: Option<(i64, i64)> = conn
        .query_row(
            "SELECT created_at, seq FROM messages WHERE chat_id = ?1 ORDER BY seq DESC LIMIT 1",
            params![chat_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let now = Utc::now();
    let (created_micros, seq) = match last {
        Some((last_micros, last_seq)) => (now.timestamp_micros().max(last_micros), last_seq + 1),
        None => (now.timestamp_micros(), 1),
    };

    conn.execute(
        "INSERT INTO messages (chat_id, sender_id, content, kind, created_at, seq)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![chat_id, sender_id, content, kind.as_str(), created_micros, seq],
    )?;

    Ok(Message {
        id: conn.last_insert_rowid(),
        chat_id,
        sender_id,
        content: content.to_string(),
        kind,
        created_at: DateTime::from_timestamp_micros(created_micros).unwrap_or(now),
        seq,
    })
}

pub struct MessageLog;

impl MessageLog {
    /// Post a user message. The sender must currently be a member.
    pub async fn append(
        pool: &DbPool,
        chat_id: i64,
        sender_id: i64,
        content: &str,
    ) -> Result<Message, LogError> {
        if content.trim().is_empty() {
            return Err(LogError::EmptyContent);
        }

        let mut conn = pool.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !chat_exists(&tx, chat_id)? {
            return Err(LogError::ChatNotFound);
        }
        if !is_member_sync(&tx, chat_id, sender_id)? {
            return Err(LogError::NotMember);
        }

        let message = insert_message(&tx, chat_id, sender_id, content, MessageKind::User)?;
        tx.commit()?;

        log::debug!("Message {} appended to chat {}", message.id, chat_id);
        Ok(message)
    }

    /// Record a server-generated message attributed to `actor_id`.
    /// Skips the membership check; runs on the caller's transaction.
    pub(crate) fn append_system(
        conn: &Connection,
        chat_id: i64,
        actor_id: i64,
        content: &str,
    ) -> Result<Message, LogError> {
        if !chat_exists(conn, chat_id)? {
            return Err(LogError::ChatNotFound);
        }
        Ok(insert_message(conn, chat_id, actor_id, content, MessageKind::System)?)
    }

    /// All messages of a chat, oldest first. Requester must be a current member.
    pub async fn list_by_chat(
        pool: &DbPool,
        chat_id: i64,
        requesting_user_id: i64,
    ) -> Result<Vec<Message>, LogError> {
        let conn = pool.lock().await;

        if !chat_exists(&conn, chat_id)? {
            return Err(LogError::ChatNotFound);
        }
        if !is_member_sync(&conn, chat_id, requesting_user_id)? {
            return Err(LogError::NotMember);
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE chat_id = ?1 ORDER BY created_at ASC, seq ASC"
        ))?;
        let messages = stmt
            .query_map(params![chat_id], message_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(messages)
    }

    /// Number of stored messages for a chat, regardless of membership
    pub async fn count_for_chat(pool: &DbPool, chat_id: i64) -> SqliteResult<i64> {
        let conn = pool.lock().await;
        conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE chat_id = ?1",
            params![chat_id],
            |row| row.get(0),
        )
    }
}
