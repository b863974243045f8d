//! CLI command implementations.

pub mod analyze;
pub mod check;
pub mod config;
pub mod export;
pub mod interactive;
