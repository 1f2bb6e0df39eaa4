use crate::checksum::ChecksumFormatError;
use crate::http::DownloadError;
use thiserror::Error;
use url::Url;

/// Provisioning errors
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("malformed checksum file {url}: {source}")]
    ChecksumFormat {
        url: Url,
        #[source]
        source: ChecksumFormatError,
    },

    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: Url,
        expected: String,
        actual: String,
    },

    #[error("I/O error during {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProvisionError {
    pub(crate) fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        ProvisionError::IoError {
            operation: operation.into(),
            source,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProvisionError::Download(e) if e.is_timeout())
    }
}
