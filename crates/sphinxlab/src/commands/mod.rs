//! CLI command implementations

pub mod build;
pub mod exec;
pub mod install;
pub mod platform;
