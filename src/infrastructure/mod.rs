//! Infrastructure layer
//!
//! Adapters for the domain ports: Postgres persistence, password hashing,
//! tracing-backed logging and mail, plus configuration loading.

pub mod config;
pub mod logging;
pub mod mail;
pub mod persistence;
pub mod security;
