use crate::exec::ExecError;
use crate::install::ProvisionError;
use crate::platform::PlatformError;
use crate::reference::ReferenceError;
use sphinxlab_core::SphinxlabError;
use thiserror::Error;

/// Failure class of an [`Error`], for callers that map errors to exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad settings or arguments; nothing was downloaded or run
    Configuration,
    /// Download, verification, or cache installation failed
    Provisioning,
    /// The binary could not be started or supervised
    Execution,
    /// A deadline expired
    Cancelled,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] SphinxlabError),

    #[error("PLATFORM_UNSUPPORTED: {0}")]
    Platform(#[from] PlatformError),

    #[error("BINARY_REFERENCE_INVALID: {0}")]
    Reference(#[from] ReferenceError),

    #[error("HTTP_CLIENT_INVALID: {0}")]
    Client(#[source] reqwest::Error),

    #[error("SPHINX_PROVISION_FAILED: {0}")]
    Provision(#[from] ProvisionError),

    #[error("SPHINX_EXEC_FAILED: {0}")]
    Exec(#[from] ExecError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) | Error::Platform(_) | Error::Reference(_) | Error::Client(_) => {
                ErrorKind::Configuration
            }
            Error::Provision(e) if e.is_timeout() => ErrorKind::Cancelled,
            Error::Provision(_) => ErrorKind::Provisioning,
            Error::Exec(ExecError::EmptyArguments) => ErrorKind::Configuration,
            Error::Exec(ExecError::TimedOut { .. }) => ErrorKind::Cancelled,
            Error::Exec(_) => ErrorKind::Execution,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::DownloadError;
    use std::path::PathBuf;
    use std::time::Duration;
    use url::Url;

    fn url() -> Url {
        Url::parse("https://example.test/v1/sphinx.linux-x86_64").unwrap()
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            Error::from(ExecError::EmptyArguments).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            Error::from(SphinxlabError::invalid_value("sphinx.version", "empty")).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            Error::from(ProvisionError::ChecksumMismatch {
                url: url(),
                expected: "00".repeat(32),
                actual: "11".repeat(32),
            })
            .kind(),
            ErrorKind::Provisioning
        );
        assert_eq!(
            Error::from(ProvisionError::from(DownloadError::TimedOut { url: url() })).kind(),
            ErrorKind::Cancelled
        );
        assert_eq!(
            Error::from(ExecError::TimedOut {
                program: PathBuf::from("sphinx"),
                timeout: Duration::from_secs(1),
            })
            .kind(),
            ErrorKind::Cancelled
        );
        assert_eq!(
            Error::from(ExecError::LaunchFailed {
                program: PathBuf::from("sphinx"),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
            .kind(),
            ErrorKind::Execution
        );
    }

    #[test]
    fn test_messages_carry_codes() {
        let err = Error::from(ProvisionError::from(DownloadError::UnexpectedStatus {
            url: url(),
            status: 404,
        }));
        let message = err.to_string();
        assert!(message.starts_with("SPHINX_PROVISION_FAILED"));
        assert!(message.contains("404"));
    }
}
