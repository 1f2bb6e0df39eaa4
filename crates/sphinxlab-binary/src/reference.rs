//! Download location and cache layout of one pinned binary
//!
//! ```text
//! {base_url}/{version}/{tool}.{classifier}[.exe]          binary
//! {base_url}/{version}/{tool}.{classifier}[.exe].sha256   sidecar
//!
//! {cache_root}/{cache_key}/{tool}.{classifier}[.exe]
//! {cache_root}/{cache_key}/{tool}.{classifier}[.exe].sha256
//! ```

use crate::platform::Platform;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Suffix of the checksum sidecar, appended to the binary URL and file name
pub const CHECKSUM_SUFFIX: &str = ".sha256";

/// Where a binary comes from and where it lives in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryReference {
    binary_url: Url,
    checksum_url: Url,
    file_name: String,
    cache_key: String,
}

impl BinaryReference {
    /// Builds the release URL for `tool` at `version` on `platform`
    ///
    /// # Arguments
    ///
    /// * `base_url` - Release root; a trailing `/` is ignored
    /// * `version` - Release tag, used verbatim in the URL
    /// * `tool_name` - Executable base name (e.g. "sphinx")
    /// * `platform` - Target platform, selects classifier and `.exe` suffix
    ///
    /// # Errors
    ///
    /// Returns `ReferenceError` if any part is empty or the result is not an
    /// absolute http(s) URL
    pub fn new(
        base_url: &str,
        version: &str,
        tool_name: &str,
        platform: &Platform,
    ) -> Result<Self, ReferenceError> {
        require_non_empty("version", version)?;
        let file_name = file_name(tool_name, platform)?;

        let base = base_url.trim().trim_end_matches('/');
        require_non_empty("base_url", base)?;

        let binary_url = parse_http_url(&format!("{}/{}/{}", base, version, file_name))?;
        Self::with_urls(binary_url, file_name, sanitize_cache_key(version))
    }

    /// Uses an explicit binary URL instead of the release layout
    ///
    /// The cache key is derived from the URL so overrides never collide with
    /// regular versions.
    pub fn from_url(
        binary_url: &str,
        tool_name: &str,
        platform: &Platform,
    ) -> Result<Self, ReferenceError> {
        let file_name = file_name(tool_name, platform)?;
        let binary_url = parse_http_url(binary_url.trim())?;
        let cache_key = sanitize_cache_key(binary_url.as_str());
        Self::with_urls(binary_url, file_name, cache_key)
    }

    fn with_urls(
        binary_url: Url,
        file_name: String,
        cache_key: String,
    ) -> Result<Self, ReferenceError> {
        let checksum_url = parse_http_url(&format!("{}{}", binary_url, CHECKSUM_SUFFIX))?;
        Ok(Self {
            binary_url,
            checksum_url,
            file_name,
            cache_key,
        })
    }

    pub fn binary_url(&self) -> &Url {
        &self.binary_url
    }

    pub fn checksum_url(&self) -> &Url {
        &self.checksum_url
    }

    /// Name of the installed executable
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Cache subdirectory name, safe as a single path segment
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub fn entry_dir(&self, cache_root: &Path) -> PathBuf {
        cache_root.join(&self.cache_key)
    }

    pub fn binary_path(&self, cache_root: &Path) -> PathBuf {
        self.entry_dir(cache_root).join(&self.file_name)
    }

    pub fn checksum_path(&self, cache_root: &Path) -> PathBuf {
        self.entry_dir(cache_root)
            .join(format!("{}{}", self.file_name, CHECKSUM_SUFFIX))
    }
}

fn file_name(tool_name: &str, platform: &Platform) -> Result<String, ReferenceError> {
    let tool_name = tool_name.trim();
    require_non_empty("tool_name", tool_name)?;
    if tool_name.contains(['/', '\\']) {
        return Err(ReferenceError::InvalidToolName {
            tool_name: tool_name.to_string(),
        });
    }

    Ok(format!(
        "{}.{}{}",
        tool_name,
        platform.classifier(),
        platform.executable_suffix()
    ))
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ReferenceError> {
    if value.trim().is_empty() {
        Err(ReferenceError::Empty { field })
    } else {
        Ok(())
    }
}

fn parse_http_url(raw: &str) -> Result<Url, ReferenceError> {
    let url = Url::parse(raw).map_err(|source| ReferenceError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;

    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(ReferenceError::NotHttp {
            url: raw.to_string(),
        }),
    }
}

/// Maps `value` onto `[A-Za-z0-9._-]`, replacing everything else with `_`
///
/// `.` and `..` are replaced as well so the key is never a relative path.
pub fn sanitize_cache_key(value: &str) -> String {
    let key: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match key.as_str() {
        "" | "." | ".." => "_".repeat(key.len().max(1)),
        _ => key,
    }
}

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("tool name '{tool_name}' must be a file name, not a path")]
    InvalidToolName { tool_name: String },

    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("'{url}' is not an absolute http(s) URL")]
    NotHttp { url: String },
}
