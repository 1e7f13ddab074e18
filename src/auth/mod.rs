//! Token authority: registration, login, bearer token issue/validation and revocation.
//!
//! Tokens are HS256 JWTs carrying the user id (`sub`), a unique `jti` used as the
//! revocation key, and the user's `token_version` at issue time. Bumping the
//! version (on password change) invalidates every older token of that user.

pub mod revocation;

use crate::config::Config;
use crate::db::{self, models::User, Database, DbPool};
use crate::error::{AuthError, StoreError};
use bcrypt::{hash, verify};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use revocation::{MemoryRevocationStore, RevocationStore};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String,
    pub jti: String,
    pub ver: i64,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::Malformed)
    }
}

/// A freshly minted token together with its claims
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub ttl_seconds: i64,
    pub bcrypt_cost: u32,
}

impl From<&Config> for TokenSettings {
    fn from(config: &Config) -> Self {
        TokenSettings {
            secret: config.jwt_secret().to_string(),
            ttl_seconds: config.token_ttl_seconds,
            bcrypt_cost: config.bcrypt_cost,
        }
    }
}

/// Verified against when the username is unknown
const DUMMY_PASSWORD: &str = "group-chat-no-such-user";

pub struct TokenAuthority {
    pool: DbPool,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
    bcrypt_cost: u32,
    dummy_hash: OnceLock<String>,
    revocations: Arc<dyn RevocationStore>,
}

impl TokenAuthority {
    /// Authority backed by an in-process revocation set
    pub fn new(pool: DbPool, settings: TokenSettings) -> Self {
        Self::with_revocation_store(pool, settings, Arc::new(MemoryRevocationStore::new()))
    }

    pub fn with_revocation_store(
        pool: DbPool,
        settings: TokenSettings,
        revocations: Arc<dyn RevocationStore>,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        TokenAuthority {
            pool,
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            ttl_seconds: settings.ttl_seconds,
            bcrypt_cost: settings.bcrypt_cost,
            dummy_hash: OnceLock::new(),
            revocations,
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Mint a token for `user` with a fresh jti. Does not touch revocation state.
    pub fn issue(&self, user: &User) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let expires_at = TimeDelta::try_seconds(self.ttl_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(StoreError::TokenLifetime(self.ttl_seconds))?;

        let claims = Claims {
            sub: user.id.to_string(),
            jti: Uuid::new_v4().to_string(),
            ver: user.token_version,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(StoreError::from)?;

        Ok(IssuedToken { token, claims })
    }

    /// Verify signature, expiry and revocation of a raw token
    pub async fn authenticate(&self, raw: &str) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(raw, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Malformed,
            })?
            .claims;

        if self.revocations.contains(&claims.jti) {
            return Err(AuthError::Revoked);
        }

        let user_id = claims.user_id()?;
        let user = Database::get_user_by_id(&self.pool, user_id)
            .await?
            .ok_or(AuthError::Malformed)?;

        if claims.ver < user.token_version {
            return Err(AuthError::Revoked);
        }

        Ok(claims)
    }

    /// Revoke a token by its jti. Returns true if this call revoked it.
    pub fn revoke(&self, claims: &Claims) -> bool {
        let newly = self.revocations.insert(&claims.jti, claims.exp);
        if newly {
            log::info!("Revoked token {} for user {}", claims.jti, claims.sub);
        }
        newly
    }

    /// Hash of `DUMMY_PASSWORD` at the configured cost, computed on first use
    fn dummy_hash(&self) -> Result<&str, AuthError> {
        if let Some(existing) = self.dummy_hash.get() {
            return Ok(existing);
        }
        let fresh = hash(DUMMY_PASSWORD, self.bcrypt_cost)?;
        Ok(self.dummy_hash.get_or_init(|| fresh))
    }

    /// Create an account
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthError::MissingData);
        }

        let password_hash = hash(password, self.bcrypt_cost)?;
        match Database::create_user(&self.pool, username, email, &password_hash).await {
            Ok(user) => {
                log::info!("Registered user {} ({})", user.username, user.id);
                Ok(user)
            }
            Err(e) if db::is_unique_violation(&e) => Err(AuthError::UserExists),
            Err(e) => Err(e.into()),
        }
    }

    /// Check credentials and issue a token. Unknown user and wrong password are
    /// indistinguishable to the caller.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let user = match Database::get_user_by_username(&self.pool, username).await? {
            Some(user) => user,
            None => {
                verify(password, self.dummy_hash()?)?;
                log::debug!("Login rejected: unknown user");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !verify(password, &user.password_hash)? {
            log::debug!("Login rejected: bad password for user {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self.issue(&user)?;
        log::info!("User {} logged in", user.id);
        Ok(issued)
    }

    /// Rotate a user's password. Every token issued before the rotation stops
    /// authenticating.
    pub async fn change_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if new_password.is_empty() {
            return Err(AuthError::MissingData);
        }

        let user = Database::get_user_by_id(&self.pool, user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify(old_password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let new_hash = hash(new_password, self.bcrypt_cost)?;
        let version =
            Database::update_password_hash(&self.pool, user_id, &user.password_hash, &new_hash)
                .await?
                .ok_or(AuthError::InvalidCredentials)?;

        log::info!("User {} changed password; token version now {}", user_id, version);
        Ok(())
    }
}
