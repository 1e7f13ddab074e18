/// Membership ledger: which users belong to which chat.
///
/// A (chat, user) pair appears at most once (primary key on `chat_members`), and
/// a chat row is never visible without at least one member: creation inserts the
/// chat and its owner's membership in the same transaction.
use chrono::Utc;
use rusqlite::{
    params, Connection, OptionalExtension, Result as SqliteResult, Row, TransactionBehavior,
};

use super::{chat_exists, is_member_sync, member_count, username_of};
use crate::chat::MessageLog;
use crate::db::models::{Chat, ChatMember};
use crate::db::{self, DbPool};
use crate::error::{LogError, MembershipError};

fn chat_from_row(row: &Row<'_>) -> SqliteResult<Chat> {
    Ok(Chat {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn display_name(conn: &Connection, user_id: i64) -> SqliteResult<String> {
    Ok(username_of(conn, user_id)?.unwrap_or_else(|| format!("user {user_id}")))
}

// System messages are written against a chat that was checked moments earlier
// inside the same transaction, so a missing chat here is a store fault.
fn system_message(
    conn: &Connection,
    chat_id: i64,
    actor_id: i64,
    content: &str,
) -> Result<(), MembershipError> {
    match MessageLog::append_system(conn, chat_id, actor_id, content) {
        Ok(_) => Ok(()),
        Err(LogError::Store(e)) => Err(MembershipError::Store(e)),
        Err(_) => Err(MembershipError::ChatNotFound),
    }
}

pub struct MembershipLedger;

impl MembershipLedger {
    /// Create a chat with `owner_id` as its only member
    pub async fn create_chat(
        pool: &DbPool,
        owner_id: i64,
        name: &str,
    ) -> Result<Chat, MembershipError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MembershipError::MissingData);
        }

        let mut conn = pool.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let owner_name = username_of(&tx, owner_id)?.ok_or(MembershipError::UserNotFound)?;
        let created_at = Utc::now().to_rfc3339();

        tx.execute(
            "INSERT INTO chats (name, created_at) VALUES (?1, ?2)",
            params![name, &created_at],
        )?;
        let chat_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO chat_members (chat_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
            params![chat_id, owner_id, &created_at],
        )?;

        system_message(&tx, chat_id, owner_id, &format!("{owner_name} created the chat"))?;
        tx.commit()?;

        log::info!("User {} created chat {} ({})", owner_id, chat_id, name);
        Ok(Chat {
            id: chat_id,
            name: name.to_string(),
            created_at,
        })
    }

    /// Add `target_user_id` to a chat on behalf of an existing member
    pub async fn add_member(
        pool: &DbPool,
        chat_id: i64,
        requesting_user_id: i64,
        target_user_id: i64,
    ) -> Result<ChatMember, MembershipError> {
        let mut conn = pool.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !chat_exists(&tx, chat_id)? {
            return Err(MembershipError::ChatNotFound);
        }
        if !is_member_sync(&tx, chat_id, requesting_user_id)? {
            return Err(MembershipError::NotMember);
        }
        let target_name = username_of(&tx, target_user_id)?.ok_or(MembershipError::UserNotFound)?;
        if is_member_sync(&tx, chat_id, target_user_id)? {
            return Err(MembershipError::AlreadyMember);
        }

        let joined_at = Utc::now().to_rfc3339();
        if let Err(e) = tx.execute(
            "INSERT INTO chat_members (chat_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
            params![chat_id, target_user_id, &joined_at],
        ) {
            return Err(if db::is_unique_violation(&e) {
                MembershipError::AlreadyMember
            } else {
                e.into()
            });
        }

        let actor_name = display_name(&tx, requesting_user_id)?;
        system_message(
            &tx,
            chat_id,
            requesting_user_id,
            &format!("{actor_name} added {target_name}"),
        )?;
        tx.commit()?;

        log::info!(
            "User {} added user {} to chat {}",
            requesting_user_id,
            target_user_id,
            chat_id
        );
        Ok(ChatMember {
            chat_id,
            user_id: target_user_id,
            username: target_name,
            joined_at,
        })
    }

    /// Delete the membership row and return how many members remain.
    /// Runs on the caller's transaction; the caller owns the teardown decision.
    pub(crate) fn remove_member(
        conn: &Connection,
        chat_id: i64,
        user_id: i64,
    ) -> Result<i64, MembershipError> {
        let removed = conn.execute(
            "DELETE FROM chat_members WHERE chat_id = ?1 AND user_id = ?2",
            params![chat_id, user_id],
        )?;
        if removed == 0 {
            return Err(MembershipError::NotMember);
        }

        Ok(member_count(conn, chat_id)?)
    }

    pub async fn is_member(
        pool: &DbPool,
        chat_id: i64,
        user_id: i64,
    ) -> Result<bool, MembershipError> {
        let conn = pool.lock().await;
        Ok(is_member_sync(&conn, chat_id, user_id)?)
    }

    pub async fn get_chat(pool: &DbPool, chat_id: i64) -> Result<Option<Chat>, MembershipError> {
        let conn = pool.lock().await;
        let chat = conn
            .query_row(
                "SELECT id, name, created_at FROM chats WHERE id = ?1",
                params![chat_id],
                chat_from_row,
            )
            .optional()?;
        Ok(chat)
    }

    /// Members of a chat, visible only to members
    pub async fn list_members(
        pool: &DbPool,
        chat_id: i64,
        requesting_user_id: i64,
    ) -> Result<Vec<ChatMember>, MembershipError> {
        let conn = pool.lock().await;

        if !chat_exists(&conn, chat_id)? {
            return Err(MembershipError::ChatNotFound);
        }
        if !is_member_sync(&conn, chat_id, requesting_user_id)? {
            return Err(MembershipError::NotMember);
        }

        let mut stmt = conn.prepare(
            "SELECT m.chat_id, m.user_id, u.username, m.joined_at
             FROM chat_members m JOIN users u ON u.id = m.user_id
             WHERE m.chat_id = ?1
             ORDER BY m.joined_at ASC, m.user_id ASC",
        )?;
        let members = stmt
            .query_map(params![chat_id], |row| {
                Ok(ChatMember {
                    chat_id: row.get(0)?,
                    user_id: row.get(1)?,
                    username: row.get(2)?,
                    joined_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(members)
    }

    /// Chats the user currently belongs to
    pub async fn list_chats_for_user(
        pool: &DbPool,
        user_id: i64,
    ) -> Result<Vec<Chat>, MembershipError> {
        let conn = pool.lock().await;

        let mut stmt = conn.prepare(
            "SELECT c.id, c.name, c.created_at
             FROM chats c JOIN chat_members m ON m.chat_id = c.id
             WHERE m.user_id = ?1
             ORDER BY c.id ASC",
        )?;
        let chats = stmt
            .query_map(params![user_id], chat_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(chats)
    }

    pub async fn member_count(pool: &DbPool, chat_id: i64) -> Result<i64, MembershipError> {
        let conn = pool.lock().await;
        Ok(member_count(&conn, chat_id)?)
    }
}
