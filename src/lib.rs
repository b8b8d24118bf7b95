//! starterkit
//!
//! Account service whose use cases run through interceptor pipelines that
//! add transactions, validation, structured logging and timing around the
//! business operation.

pub mod adapters;
pub mod application;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
mod test_support;
