/// Data models for database operations.
/// Represents users, chats, memberships and messages, plus the request/response DTOs.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(skip_serializing, default)]
    pub token_version: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chat {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

/// A membership row joined with the member's username
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMember {
    pub chat_id: i64,
    pub user_id: i64,
    pub username: String,
    pub joined_at: String,
}

/// Whether a message was typed by a user or generated by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    System,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::User => "user",
            MessageKind::System => "system",
        }
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageKind::User),
            "system" => Ok(MessageKind::System),
            other => Err(format!("unknown message kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub kind: MessageKind,
    pub created_at: DateTime<Utc>,
    pub seq: i64,
}

// Request/Response DTOs
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: i64,
    pub user_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateChatRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddMemberRequest {
    pub target_user_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostMessageRequest {
    pub chat_id: i64,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_serialization_hides_secrets() {
        let user = User {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$2b$04$hash".to_string(),
            token_version: 3,
            created_at: "2025-10-20T10:00:00Z".to_string(),
        };

        let json = serde_json::to_value(&user).expect("Serialization failed");
        assert_eq!(json["username"], "alice");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("token_version").is_none());
    }

    #[test]
    fn test_message_kind_round_trip() {
        assert_eq!("system".parse::<MessageKind>(), Ok(MessageKind::System));
        assert_eq!(MessageKind::User.as_str(), "user");
        assert!("bogus".parse::<MessageKind>().is_err());
        assert_eq!(
            serde_json::to_string(&MessageKind::System).unwrap(),
            "\"system\""
        );
    }

    #[test]
    fn test_register_request_missing_fields_default_to_empty() {
        let request: RegisterRequest =
            serde_json::from_str(r#"{"username": "bob"}"#).expect("Deserialization failed");
        assert_eq!(request.username, "bob");
        assert!(request.email.is_empty());
        assert!(request.password.is_empty());
    }
}
