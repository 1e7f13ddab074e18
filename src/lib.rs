//! Group chat server library.
//!
//! Exposes the storage, authentication and chat layers so the binary and the
//! integration tests share one implementation.
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod seed;
pub mod server;
