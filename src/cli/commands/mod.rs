//! CLI command implementations

pub mod config;
pub mod locate;

pub use config::execute as config;
pub use locate::execute as locate;
