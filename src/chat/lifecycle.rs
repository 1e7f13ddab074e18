/// Chat lifecycle: leaving a chat and tearing it down once the last member is gone.
///
/// A chat is `Active` while it has at least one member. The leave that drops
/// the count to zero deletes its messages and then the chat row, inside the same
/// transaction that removed the membership. Deleted ids are never reused.
use rusqlite::{params, Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};

use super::{chat_exists, is_member_sync, username_of};
use crate::chat::{MembershipLedger, MessageLog};
use crate::db::models::ChatMember;
use crate::db::DbPool;
use crate::error::{LifecycleError, MembershipError, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaveOutcome {
    pub chat_id: i64,
    pub user_id: i64,
    pub remaining_members: i64,
    pub chat_deleted: bool,
}

/// Delete every message of the chat, then the chat row. Returns the number of
/// messages removed.
fn teardown(conn: &Connection, chat_id: i64) -> Result<usize, StoreError> {
    let messages = conn.execute("DELETE FROM messages WHERE chat_id = ?1", params![chat_id])?;
    conn.execute("DELETE FROM chats WHERE id = ?1", params![chat_id])?;
    Ok(messages)
}

pub struct ChatLifecycle;

impl ChatLifecycle {
    /// Remove `user_id` from the chat, deleting the chat if nobody is left
    pub async fn leave(
        pool: &DbPool,
        chat_id: i64,
        user_id: i64,
    ) -> Result<LeaveOutcome, LifecycleError> {
        let mut conn = pool.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !chat_exists(&tx, chat_id)? {
            return Err(MembershipError::ChatNotFound.into());
        }
        if !is_member_sync(&tx, chat_id, user_id)? {
            return Err(MembershipError::NotMember.into());
        }

        // Written before any teardown so readers holding the chat see why it emptied
        let name = username_of(&tx, user_id)?.unwrap_or_else(|| format!("user {user_id}"));
        MessageLog::append_system(&tx, chat_id, user_id, &format!("{name} left the chat"))?;

        let remaining_members = MembershipLedger::remove_member(&tx, chat_id, user_id)?;

        let chat_deleted = if remaining_members == 0 {
            let removed = teardown(&tx, chat_id)?;
            log::info!("Chat {} torn down ({} messages removed)", chat_id, removed);
            true
        } else {
            false
        };

        tx.commit()?;

        log::info!(
            "User {} left chat {} ({} members remain)",
            user_id,
            chat_id,
            remaining_members
        );
        Ok(LeaveOutcome {
            chat_id,
            user_id,
            remaining_members,
            chat_deleted,
        })
    }

    /// Add a user to a chat; membership failures pass through unchanged
    pub async fn add_user(
        pool: &DbPool,
        chat_id: i64,
        acting_user_id: i64,
        target_user_id: i64,
    ) -> Result<ChatMember, LifecycleError> {
        Ok(MembershipLedger::add_member(pool, chat_id, acting_user_id, target_user_id).await?)
    }
}
