/// Authentication gate for protected routes.
///
/// `AuthenticatedUser` is an extractor: a handler that takes it as an argument
/// only runs once the presented token has been validated against the
/// `TokenAuthority` (signature, expiry, revocation, token version). A failed
/// gate answers 401 before the handler body touches any state.
use crate::auth::{Claims, TokenAuthority};
use crate::error::AuthError;
use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

/// Cookie carrying the token for clients that cannot set headers
pub const SESSION_COOKIE: &str = "session_token";

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub claims: Claims,
}

/// Pull the raw token from `Authorization: Bearer ...`, falling back to the session cookie
fn presented_token(req: &HttpRequest) -> Option<String> {
    if let Some(value) = req.headers().get(header::AUTHORIZATION) {
        let value = value.to_str().ok()?;
        let token = value.strip_prefix("Bearer ")?.trim();
        return (!token.is_empty()).then(|| token.to_string());
    }

    req.cookie(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

impl FromRequest for AuthenticatedUser {
    type Error = AuthError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let authority = req.app_data::<web::Data<TokenAuthority>>().cloned();
        let token = presented_token(req);
        let path = req.path().to_string();

        Box::pin(async move {
            let authority = match authority {
                Some(authority) => authority,
                None => {
                    log::error!("TokenAuthority missing from app data; rejecting {}", path);
                    return Err(AuthError::Malformed);
                }
            };

            let token = token.ok_or_else(|| {
                log::debug!("No token presented for {}", path);
                AuthError::Malformed
            })?;

            let claims = authority.authenticate(&token).await.map_err(|e| {
                log::warn!("Rejected token for {}: {}", path, e);
                e
            })?;

            Ok(AuthenticatedUser {
                user_id: claims.user_id()?,
                claims,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{cookie::Cookie, test::TestRequest};

    #[test]
    fn test_bearer_header_token() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def.ghi"))
            .to_http_request();
        assert_eq!(presented_token(&req), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_non_bearer_header_rejected() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();
        assert_eq!(presented_token(&req), None);
    }

    #[test]
    fn test_cookie_token() {
        let req = TestRequest::default()
            .cookie(Cookie::new(SESSION_COOKIE, "cookie.token.value"))
            .to_http_request();
        assert_eq!(presented_token(&req), Some("cookie.token.value".to_string()));
    }

    #[test]
    fn test_no_token() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(presented_token(&req), None);
    }
}
