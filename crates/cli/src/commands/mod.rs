//! CLI command implementations

pub mod exec;
pub mod extract;
pub mod schema;
pub mod solve;
