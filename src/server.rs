/// HTTP server factory and configuration.
/// Provides a reusable function to create and configure the HTTP server
/// for use in both the main binary and tests.

use crate::auth::TokenAuthority;
use crate::db::DbPool;
use crate::handlers::{
    add_member, change_password, create_chat, get_user, health, leave_chat, list_chats,
    list_members, list_messages, list_users, login, logout, me, post_message, register,
};
use actix_web::{middleware, web, App, HttpServer};

/// Register every route on an app or scope
///
/// Shared by the real server and by `actix_web::test::init_service` in tests so
/// the routing table exists in exactly one place.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Public endpoints
        .route("/health", web::get().to(health))
        .route("/register", web::post().to(register))
        .route("/login", web::post().to(login))
        // Account endpoints (token required)
        .route("/logout", web::post().to(logout))
        .route("/change-password", web::post().to(change_password))
        .route("/me", web::get().to(me))
        .route("/users", web::get().to(list_users))
        .route("/users/{id}", web::get().to(get_user))
        // Chat endpoints (token required)
        .route("/chats", web::post().to(create_chat))
        .route("/chats", web::get().to(list_chats))
        .route("/chats/{id}/members", web::post().to(add_member))
        .route("/chats/{id}/members", web::get().to(list_members))
        .route("/chats/{id}/leave", web::post().to(leave_chat))
        .route("/chats/{id}/messages", web::get().to(list_messages))
        .route("/messages", web::post().to(post_message));
}

/// Create a configured HTTP server
///
/// Takes a database pool, the token authority, and bind address, then returns a
/// fully configured `HttpServer` ready to be run.
///
/// # Example
/// ```ignore
/// let pool = db::create_pool("chatserver.db")?;
/// let authority = web::Data::new(TokenAuthority::new(pool.clone(), settings));
/// let server = server::create_http_server(web::Data::new(pool), authority, "127.0.0.1:4000")?;
/// server.await?;
/// ```
pub fn create_http_server(
    pool: web::Data<DbPool>,
    authority: web::Data<TokenAuthority>,
    bind_addr: &str,
) -> std::io::Result<actix_web::dev::Server> {
    let server = HttpServer::new(move || {
        App::new()
            .app_data(pool.clone())
            .app_data(authority.clone())
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
    })
    .bind(bind_addr)?
    .run();

    Ok(server)
}

/// Create a test HTTP server with an in-memory database
///
/// Binds to a random available port and returns the server together with the
/// address it listens on.
#[cfg(any(test, feature = "test_utils"))]
pub fn create_test_http_server() -> std::io::Result<(actix_web::dev::Server, String)> {
    use crate::auth::TokenSettings;

    let pool = crate::db::create_test_pool();
    let authority = web::Data::new(TokenAuthority::new(
        pool.clone(),
        TokenSettings {
            secret: "test-secret".to_string(),
            ttl_seconds: 3600,
            bcrypt_cost: 4,
        },
    ));
    let pool = web::Data::new(pool);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(pool.clone())
            .app_data(authority.clone())
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
    })
    .workers(1)
    .bind("127.0.0.1:0")?;

    // Get the actual bind address (including the assigned port)
    let addr_str = server
        .addrs()
        .first()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "No bind address found"))?
        .to_string();

    Ok((server.run(), addr_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenSettings;
    use actix_web::test;
    use serde_json::{json, Value};

    fn test_state() -> (web::Data<DbPool>, web::Data<TokenAuthority>) {
        let pool = crate::db::create_test_pool();
        let authority = TokenAuthority::new(
            pool.clone(),
            TokenSettings {
                secret: "server-test-secret".to_string(),
                ttl_seconds: 3600,
                bcrypt_cost: 4,
            },
        );
        (web::Data::new(pool), web::Data::new(authority))
    }

    #[tokio::test]
    async fn test_create_http_server_with_test_pool() {
        let (pool, authority) = test_state();
        let result = create_http_server(pool, authority, "127.0.0.1:0");
        assert!(result.is_ok(), "create_http_server should succeed");
    }

    #[tokio::test]
    async fn test_create_http_server_invalid_address() {
        let (pool, authority) = test_state();
        let result = create_http_server(pool, authority, "invalid_address:99999");
        assert!(result.is_err(), "create_http_server should fail with invalid address");
    }

    #[tokio::test]
    async fn test_create_test_http_server() {
        let (_server, addr) = create_test_http_server().expect("server should bind");
        assert!(addr.starts_with("127.0.0.1:"));
        let port_part = addr.split(':').nth(1).unwrap_or("");
        assert!(!port_part.is_empty() && port_part != "0", "Port should be assigned");
    }

    #[actix_web::test]
    async fn test_health_endpoint() {
        let (pool, authority) = test_state();
        let app = test::init_service(
            App::new()
                .app_data(pool)
                .app_data(authority)
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_protected_route_requires_token() {
        let (pool, authority) = test_state();
        let app = test::init_service(
            App::new()
                .app_data(pool)
                .app_data(authority)
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/chats").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "error": "invalid_token" }));
    }

    #[actix_web::test]
    async fn test_register_then_login() {
        let (pool, authority) = test_state();
        let app = test::init_service(
            App::new()
                .app_data(pool)
                .app_data(authority)
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/register")
            .set_json(json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "s3cret"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "username": "alice", "password": "s3cret" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        assert!(resp
            .response()
            .cookies()
            .any(|c| c.name() == crate::handlers::auth_gate::SESSION_COOKIE));

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["token_type"], "Bearer");
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    }
}
