/// REST API handlers for chats, memberships and messages.
/// Every handler takes `AuthenticatedUser`, so the token gate runs first.

use super::auth_gate::AuthenticatedUser;
use crate::chat::{ChatLifecycle, MembershipLedger, MessageLog};
use crate::db::{models::*, DbPool};
use crate::error::{LifecycleError, LogError, MembershipError};
use actix_web::{web, HttpResponse};

/// Create a chat with the caller as sole member
/// POST /chats
pub async fn create_chat(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    req: web::Json<CreateChatRequest>,
) -> Result<HttpResponse, MembershipError> {
    let chat = MembershipLedger::create_chat(&pool, user.user_id, &req.name).await?;
    Ok(HttpResponse::Created().json(chat))
}

/// Chats the caller belongs to
/// GET /chats
pub async fn list_chats(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, MembershipError> {
    let chats = MembershipLedger::list_chats_for_user(&pool, user.user_id).await?;
    Ok(HttpResponse::Ok().json(chats))
}

/// Add a user to a chat
/// POST /chats/{id}/members
pub async fn add_member(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    chat_id: web::Path<i64>,
    req: web::Json<AddMemberRequest>,
) -> Result<HttpResponse, LifecycleError> {
    let member =
        ChatLifecycle::add_user(&pool, chat_id.into_inner(), user.user_id, req.target_user_id)
            .await?;
    Ok(HttpResponse::Created().json(member))
}

/// Members of a chat
/// GET /chats/{id}/members
pub async fn list_members(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    chat_id: web::Path<i64>,
) -> Result<HttpResponse, MembershipError> {
    let members = MembershipLedger::list_members(&pool, chat_id.into_inner(), user.user_id).await?;
    Ok(HttpResponse::Ok().json(members))
}

/// Leave a chat; the last member leaving deletes it
/// POST /chats/{id}/leave
pub async fn leave_chat(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    chat_id: web::Path<i64>,
) -> Result<HttpResponse, LifecycleError> {
    let outcome = ChatLifecycle::leave(&pool, chat_id.into_inner(), user.user_id).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Messages of a chat, oldest first
/// GET /chats/{id}/messages
pub async fn list_messages(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    chat_id: web::Path<i64>,
) -> Result<HttpResponse, LogError> {
    let messages = MessageLog::list_by_chat(&pool, chat_id.into_inner(), user.user_id).await?;
    Ok(HttpResponse::Ok().json(messages))
}

/// Post a message to a chat
/// POST /messages
pub async fn post_message(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    req: web::Json<PostMessageRequest>,
) -> Result<HttpResponse, LogError> {
    let message = MessageLog::append(&pool, req.chat_id, user.user_id, &req.content).await?;
    Ok(HttpResponse::Created().json(message))
}
