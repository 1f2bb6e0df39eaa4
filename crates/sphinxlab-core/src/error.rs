use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SphinxlabError {
    // Config errors
    #[error("CONFIG_NOT_FOUND: {0} does not exist")]
    ConfigNotFound(PathBuf),

    #[error("CONFIG_PARSE_ERROR: {0}")]
    ConfigParseError(String),

    #[error("CONFIG_INVALID_VALUE: {field}: {reason}")]
    ConfigInvalidValue { field: String, reason: String },

    #[error("CACHE_DIR_UNAVAILABLE: could not determine a cache directory for the current user")]
    CacheDirUnavailable,

    // Build errors
    #[error("BUILD_FAILED: {0}")]
    BuildFailed(String),

    #[error("BUILD_DIRECTORY_INVALID: {path}: {reason}")]
    BuildDirectoryInvalid { path: PathBuf, reason: String },

    // Output post-processing errors
    #[error("OUTPUT_CONVERSION_FAILED: {path}: {source}")]
    OutputConversionFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO_ERROR: {0}")]
    IoError(#[from] std::io::Error),

    // Generic errors
    #[error("{0}")]
    Generic(String),
}

impl SphinxlabError {
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SphinxlabError::ConfigInvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for SphinxlabError {
    fn from(err: toml::de::Error) -> Self {
        SphinxlabError::ConfigParseError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SphinxlabError>;
