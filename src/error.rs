/// Error types for the chat server.
///
/// Domain errors (`AuthError`, `MembershipError`, `LogError`, `LifecycleError`) are
/// recoverable by the caller and render as 4xx responses. `StoreError` is the
/// infrastructure failure carried inside each of them and renders as 500.
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Token encoding error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Token lifetime of {0}s is out of range")]
    TokenLifetime(i64),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Malformed token")]
    Malformed,

    #[error("Token expired")]
    Expired,

    #[error("Token revoked")]
    Revoked,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Missing data")]
    MissingData,

    #[error("User already exists")]
    UserExists,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum MembershipError {
    #[error("Chat not found")]
    ChatNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("User is already a member of this chat")]
    AlreadyMember,

    #[error("User is not a member of this chat")]
    NotMember,

    #[error("Missing data")]
    MissingData,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("Chat not found")]
    ChatNotFound,

    #[error("User is not a member of this chat")]
    NotMember,

    #[error("Message content is empty")]
    EmptyContent,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error(transparent)]
    Membership(#[from] MembershipError),

    #[error(transparent)]
    Log(#[from] LogError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

macro_rules! store_conversions {
    ($($target:ty),+) => {
        $(
            impl From<rusqlite::Error> for $target {
                fn from(e: rusqlite::Error) -> Self {
                    Self::Store(StoreError::Sqlite(e))
                }
            }
        )+
    };
}

store_conversions!(AuthError, MembershipError, LogError, LifecycleError);

impl From<bcrypt::BcryptError> for AuthError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AuthError::Store(StoreError::Hash(e))
    }
}

impl AuthError {
    /// Short machine-readable code used in gate rejections.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Revoked => "token_revoked",
            AuthError::Malformed | AuthError::Expired => "invalid_token",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::MissingData => "missing_data",
            AuthError::UserExists => "user_exists",
            AuthError::Store(_) => "internal_error",
        }
    }
}

impl MembershipError {
    pub fn code(&self) -> &'static str {
        match self {
            MembershipError::ChatNotFound => "ChatNotFound",
            MembershipError::UserNotFound => "UserNotFound",
            MembershipError::AlreadyMember => "AlreadyMember",
            MembershipError::NotMember => "NotMember",
            MembershipError::MissingData => "MissingData",
            MembershipError::Store(_) => "internal_error",
        }
    }
}

impl LogError {
    pub fn code(&self) -> &'static str {
        match self {
            LogError::ChatNotFound => "ChatNotFound",
            LogError::NotMember => "NotMember",
            LogError::EmptyContent => "EmptyContent",
            LogError::Store(_) => "internal_error",
        }
    }
}

fn internal_error(e: &StoreError) -> HttpResponse {
    log::error!("Store failure: {}", e);
    HttpResponse::InternalServerError().json(json!({
        "error": "Internal server error"
    }))
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Malformed
            | AuthError::Expired
            | AuthError::Revoked
            | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::MissingData | AuthError::UserExists => StatusCode::BAD_REQUEST,
            AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AuthError::Store(e) => internal_error(e),
            AuthError::Malformed | AuthError::Expired | AuthError::Revoked => {
                HttpResponse::build(self.status_code()).json(json!({ "error": self.code() }))
            }
            _ => HttpResponse::build(self.status_code()).json(json!({
                "error": self.to_string()
            })),
        }
    }
}

impl ResponseError for MembershipError {
    fn status_code(&self) -> StatusCode {
        match self {
            MembershipError::ChatNotFound | MembershipError::UserNotFound => StatusCode::NOT_FOUND,
            MembershipError::AlreadyMember => StatusCode::CONFLICT,
            MembershipError::NotMember => StatusCode::FORBIDDEN,
            MembershipError::MissingData => StatusCode::BAD_REQUEST,
            MembershipError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            MembershipError::Store(e) => internal_error(e),
            _ => HttpResponse::build(self.status_code()).json(json!({
                "error": self.to_string(),
                "code": self.code()
            })),
        }
    }
}

impl ResponseError for LogError {
    fn status_code(&self) -> StatusCode {
        match self {
            LogError::ChatNotFound => StatusCode::NOT_FOUND,
            LogError::NotMember => StatusCode::FORBIDDEN,
            LogError::EmptyContent => StatusCode::BAD_REQUEST,
            LogError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            LogError::Store(e) => internal_error(e),
            _ => HttpResponse::build(self.status_code()).json(json!({
                "error": self.to_string(),
                "code": self.code()
            })),
        }
    }
}

impl ResponseError for LifecycleError {
    fn status_code(&self) -> StatusCode {
        match self {
            LifecycleError::Membership(e) => e.status_code(),
            LifecycleError::Log(e) => e.status_code(),
            LifecycleError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            LifecycleError::Membership(e) => e.error_response(),
            LifecycleError::Log(e) => e.error_response(),
            LifecycleError::Store(e) => internal_error(e),
        }
    }
}
