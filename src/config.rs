/// Configuration management for the group chat server.
/// Handles command-line argument parsing; every flag can also come from the environment.
use clap::Parser;
use std::path::PathBuf;

/// Secret used when none is configured. Only suitable for local development.
pub const DEV_JWT_SECRET: &str = "group-chat-dev-secret-change-me";

/// Longest token lifetime accepted from the command line
pub const MAX_TOKEN_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

#[derive(Parser, Debug, Clone)]
#[command(name = "Group Chat Server")]
#[command(about = "Multi-user group chat backend", long_about = None)]
pub struct Config {
    /// Server port (default: 4000)
    #[arg(long, env = "CHAT_PORT", default_value = "4000")]
    pub port: u16,

    /// SQLite database file path (default: chatserver.db)
    #[arg(long, env = "CHAT_DATABASE", default_value = "chatserver.db")]
    pub database: PathBuf,

    /// PID file path (optional) - write server PID to this file on startup
    #[arg(long)]
    pub pidfile: Option<PathBuf>,

    /// HMAC secret for signing bearer tokens
    #[arg(long, env = "CHAT_JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Validity window of issued tokens, in seconds (1 to one year)
    #[arg(
        long,
        env = "CHAT_TOKEN_TTL",
        default_value = "86400",
        value_parser = clap::value_parser!(i64).range(1..=MAX_TOKEN_TTL_SECONDS)
    )]
    pub token_ttl_seconds: i64,

    /// bcrypt work factor for stored password hashes
    #[arg(long, env = "CHAT_BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST)]
    pub bcrypt_cost: u32,

    /// Populate demo users, chats and messages on startup
    #[arg(long)]
    pub seed: bool,
}

impl Config {
    /// Parse command-line arguments into Config
    pub fn from_args() -> Self {
        Config::parse()
    }

    /// The configured signing secret, falling back to the development secret.
    pub fn jwt_secret(&self) -> &str {
        match &self.jwt_secret {
            Some(secret) => secret,
            None => {
                log::warn!("No JWT secret configured; using the development secret");
                DEV_JWT_SECRET
            }
        }
    }
}
