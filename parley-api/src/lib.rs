//! # Parley API Server Library
//!
//! HTTP surface of Parley: account signup, email verification, login and
//! password reset, plus the chat relay in front of the language model.
//!
//! ## Modules
//!
//! - `app`: application state, router and bearer authentication layer
//! - `config`: configuration from the environment
//! - `error`: error handling and HTTP response mapping
//! - `routes`: route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
