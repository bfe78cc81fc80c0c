//! CLI command implementations.

pub mod admin;
pub mod gateway;

pub use admin::run_admin;
pub use gateway::run_gateway;
