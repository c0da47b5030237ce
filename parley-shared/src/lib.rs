//! # Parley Shared Library
//!
//! Domain logic behind the Parley API: accounts, credentials, conversations
//! and the services they talk to.
//!
//! ## Module Organization
//!
//! - `models`: database models and their queries
//! - `store`: persistence traits with Postgres and in-memory implementations
//! - `auth`: password policy, signed tokens, verification codes, bearer auth
//! - `mail`: mail transports and account notification emails
//! - `llm`: chat-completion client
//! - `db`: connection pool and migrations

pub mod auth;
pub mod db;
pub mod llm;
pub mod mail;
pub mod models;
pub mod store;

/// Current version of the Parley shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
