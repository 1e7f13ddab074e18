/// HTTP handlers module
/// Provides the REST endpoints and the token gate they sit behind

pub mod auth_gate;
pub mod chats;
pub mod rest;

pub use auth_gate::AuthenticatedUser;
pub use chats::{
    add_member, create_chat, leave_chat, list_chats, list_members, list_messages, post_message,
};
pub use rest::{change_password, get_user, health, list_users, login, logout, me, register};
