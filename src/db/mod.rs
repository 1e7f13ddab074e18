/// Database layer for persistent storage.
/// Owns the SQLite connection and the user (credential) records.
/// Chat, membership and message rows are managed by the `chat` module.

pub mod init;
pub mod models;

use chrono::Utc;
use models::User;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::Arc;
use tokio::sync::Mutex;

pub type DbPool = Arc<Mutex<Connection>>;

/// Create a connection pool (simplified for single-threaded SQLite)
///
/// Every operation takes the mutex for its whole duration, so multi-step
/// transactions never interleave with other requests.
pub fn create_pool(db_path: &str) -> SqliteResult<DbPool> {
    let conn = Connection::open(db_path)?;
    init::initialize_database(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Create an in-memory database for testing
#[cfg(any(test, feature = "test_utils"))]
pub fn create_test_pool() -> DbPool {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory DB");
    init::initialize_database(&conn).expect("Failed to initialize DB");
    Arc::new(Mutex::new(conn))
}

const USER_COLUMNS: &str = "id, username, email, password_hash, token_version, created_at";

fn user_from_row(row: &Row<'_>) -> SqliteResult<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        token_version: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Look up a user on an already-locked connection
pub(crate) fn find_user_by_id(conn: &Connection, user_id: i64) -> SqliteResult<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![user_id],
        user_from_row,
    )
    .optional()
}

/// Returns true when the error is a UNIQUE / PRIMARY KEY violation
pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Credential store operations
pub struct Database;

impl Database {
    /// Insert a new user with an already hashed password
    pub async fn create_user(
        pool: &DbPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> SqliteResult<User> {
        let conn = pool.lock().await;
        let created_at = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO users (username, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![username, email, password_hash, &created_at],
        )?;

        let id = conn.last_insert_rowid();
        Ok(User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            token_version: 0,
            created_at,
        })
    }

    /// Get user by username
    pub async fn get_user_by_username(pool: &DbPool, username: &str) -> SqliteResult<Option<User>> {
        let conn = pool.lock().await;

        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            user_from_row,
        )
        .optional()
    }

    /// Get user by ID
    pub async fn get_user_by_id(pool: &DbPool, user_id: i64) -> SqliteResult<Option<User>> {
        let conn = pool.lock().await;
        find_user_by_id(&conn, user_id)
    }

    /// List all users ordered by id
    pub async fn list_users(pool: &DbPool) -> SqliteResult<Vec<User>> {
        let conn = pool.lock().await;

        let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"))?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Replace the stored hash and bump the token version in one statement.
    /// Only succeeds if the hash is still `expected_hash`, so two concurrent
    /// rotations cannot both win. Returns the new token version.
    pub async fn update_password_hash(
        pool: &DbPool,
        user_id: i64,
        expected_hash: &str,
        new_hash: &str,
    ) -> SqliteResult<Option<i64>> {
        let conn = pool.lock().await;

        let updated = conn.execute(
            "UPDATE users SET password_hash = ?1, token_version = token_version + 1
             WHERE id = ?2 AND password_hash = ?3",
            params![new_hash, user_id, expected_hash],
        )?;

        if updated == 0 {
            return Ok(None);
        }

        conn.query_row(
            "SELECT token_version FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()
    }
}
