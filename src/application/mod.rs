//! Application layer
//!
//! Use cases that orchestrate the domain services, and the interceptors and
//! aspect tables that wrap them with cross-cutting behavior.

pub mod aspects;
pub mod auth;
pub mod pipelines;
