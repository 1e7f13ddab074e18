//! Demo data for local runs (`--seed`).
use crate::chat::{MembershipLedger, MessageLog};
use crate::db::{Database, DbPool};
use anyhow::Context;

const DEMO_PASSWORD: &str = "password";
const DEMO_USERS: [&str; 2] = ["alice", "bob"];
const DEMO_CHATS: [&str; 2] = ["General", "Random"];

/// Populate two users, two shared chats and one message from each user per chat.
///
/// Returns `false` without writing anything when any user already exists.
pub async fn seed_demo_data(pool: &DbPool, bcrypt_cost: u32) -> anyhow::Result<bool> {
    if !Database::list_users(pool).await?.is_empty() {
        log::info!("Users already present; skipping demo seed");
        return Ok(false);
    }

    let hash = bcrypt::hash(DEMO_PASSWORD, bcrypt_cost).context("hashing demo password")?;

    let mut user_ids = Vec::with_capacity(DEMO_USERS.len());
    for name in DEMO_USERS {
        let user = Database::create_user(pool, name, &format!("{name}@example.com"), &hash)
            .await
            .with_context(|| format!("creating demo user {name}"))?;
        user_ids.push((name, user.id));
    }

    let (_, owner) = user_ids[0];
    for chat_name in DEMO_CHATS {
        let chat = MembershipLedger::create_chat(pool, owner, chat_name).await?;
        for &(_, user_id) in &user_ids[1..] {
            MembershipLedger::add_member(pool, chat.id, owner, user_id).await?;
        }
        for &(name, user_id) in &user_ids {
            MessageLog::append(pool, chat.id, user_id, &format!("Hello from {name}!")).await?;
        }
    }

    log::info!(
        "Seeded {} demo users and {} chats",
        DEMO_USERS.len(),
        DEMO_CHATS.len()
    );
    Ok(true)
}
