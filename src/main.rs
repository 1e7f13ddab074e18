/// Group Chat Server
///
/// Main server entry point. Handles:
/// - Command-line argument parsing
/// - Database initialization and optional demo seeding
/// - HTTP server startup
use actix_web::web;
use group_chat_server::auth::{TokenAuthority, TokenSettings};
use group_chat_server::config::Config;
use group_chat_server::{db, seed, server};
use std::fs;
use std::io;
use std::process;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .init();

    let config = Config::from_args();

    log::info!("Starting Group Chat Server");
    log::info!("Database: {:?}", config.database);
    log::info!("Port: {}", config.port);
    log::info!("Token TTL: {}s", config.token_ttl_seconds);

    // Write PID file if specified
    if let Some(pidfile) = &config.pidfile {
        fs::write(pidfile, process::id().to_string())?;
        log::info!("PID file written to: {:?}", pidfile);
    }

    // Initialize database
    let db_path = config.database.to_string_lossy();
    let pool = db::create_pool(&db_path)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("database: {e}")))?;

    log::info!("Database initialized");

    if config.seed {
        seed::seed_demo_data(&pool, config.bcrypt_cost)
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("seeding: {e:#}")))?;
    }

    let authority = web::Data::new(TokenAuthority::new(
        pool.clone(),
        TokenSettings::from(&config),
    ));

    // Start HTTP server
    let bind_addr = format!("127.0.0.1:{}", config.port);
    log::info!("Starting HTTP server on {}", bind_addr);

    let http_server = server::create_http_server(web::Data::new(pool), authority, &bind_addr)?;
    http_server.await
}
