// Core modules
pub mod config;
pub mod error;
pub mod output;

// Re-export commonly used types
pub use error::{Result, SphinxlabError};
