/// REST API handlers for accounts and users.
/// Handles registration, login/logout, password change and user lookup.

use super::auth_gate::{AuthenticatedUser, SESSION_COOKIE};
use crate::auth::TokenAuthority;
use crate::db::{models::*, Database, DbPool};
use crate::error::AuthError;
use actix_web::{
    cookie::{Cookie, SameSite},
    web, HttpResponse, Result as ActixResult,
};
use serde_json::json;

/// Register a new user
/// POST /register
pub async fn register(
    authority: web::Data<TokenAuthority>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AuthError> {
    let user = authority
        .register(&req.username, &req.email, &req.password)
        .await?;

    Ok(HttpResponse::Created().json(user))
}

/// Exchange credentials for a bearer token
/// POST /login
pub async fn login(
    authority: web::Data<TokenAuthority>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, AuthError> {
    let issued = authority.login(&req.username, &req.password).await?;
    let user_id = issued.claims.user_id()?;

    let cookie = Cookie::build(SESSION_COOKIE, issued.token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .finish();

    Ok(HttpResponse::Ok().cookie(cookie).json(LoginResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_at: issued.claims.exp,
        user_id,
    }))
}

/// Revoke the presented token
/// POST /logout
pub async fn logout(
    authority: web::Data<TokenAuthority>,
    user: AuthenticatedUser,
) -> ActixResult<HttpResponse> {
    let revoked = authority.revoke(&user.claims);

    let mut removal = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .finish();
    removal.make_removal();

    Ok(HttpResponse::Ok().cookie(removal).json(json!({
        "revoked": revoked
    })))
}

/// Rotate the caller's password
/// POST /change-password
pub async fn change_password(
    authority: web::Data<TokenAuthority>,
    user: AuthenticatedUser,
    req: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, AuthError> {
    match authority
        .change_password(user.user_id, &req.old_password, &req.new_password)
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "message": "Password changed"
        }))),
        Err(AuthError::InvalidCredentials) => Ok(HttpResponse::BadRequest().json(json!({
            "error": "Old password is incorrect"
        }))),
        Err(e) => Err(e),
    }
}

/// The authenticated caller's own record
/// GET /me
pub async fn me(pool: web::Data<DbPool>, user: AuthenticatedUser) -> ActixResult<HttpResponse> {
    get_user_response(&pool, user.user_id).await
}

/// List all users
/// GET /users
pub async fn list_users(
    pool: web::Data<DbPool>,
    _user: AuthenticatedUser,
) -> ActixResult<HttpResponse> {
    match Database::list_users(&pool).await {
        Ok(users) => Ok(HttpResponse::Ok().json(users)),
        Err(e) => {
            log::error!("Database error: {}", e);
            Ok(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to list users"
            })))
        }
    }
}

/// Get a user by id
/// GET /users/{id}
pub async fn get_user(
    pool: web::Data<DbPool>,
    _user: AuthenticatedUser,
    user_id: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    get_user_response(&pool, user_id.into_inner()).await
}

async fn get_user_response(pool: &DbPool, user_id: i64) -> ActixResult<HttpResponse> {
    match Database::get_user_by_id(pool, user_id).await {
        Ok(Some(user)) => Ok(HttpResponse::Ok().json(user)),
        Ok(None) => Ok(HttpResponse::NotFound().json(json!({
            "error": "User not found"
        }))),
        Err(e) => {
            log::error!("Database error: {}", e);
            Ok(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to retrieve user"
            })))
        }
    }
}

/// Health check endpoint
/// GET /health
pub async fn health() -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "ok"
    })))
}
