pub mod auth;
pub mod interception;
