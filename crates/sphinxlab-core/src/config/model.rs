use crate::config::consts;
use crate::error::{Result, SphinxlabError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// sphinxlab.toml schema
///
/// Every section is optional; a project without a config file runs with
/// the defaults below.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sphinx: SphinxConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub exec: ExecConfig,
    #[serde(default)]
    pub build: BuildConfig,
}

/// Which Sphinx binary to run and where to keep it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SphinxConfig {
    /// Release tag, matched exactly
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_tool_name")]
    pub tool_name: String,
    /// Full download URL, replaces `{base_url}/{version}/{tool}.{classifier}`
    #[serde(default)]
    pub binary_url: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Platform classifier override (e.g. "linux-x86_64")
    #[serde(default)]
    pub platform: Option<String>,
    /// Command the invoked tool uses to launch PlantUML
    #[serde(default)]
    pub plantuml: Option<String>,
}

impl Default for SphinxConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            base_url: default_base_url(),
            tool_name: default_tool_name(),
            binary_url: None,
            cache_dir: None,
            platform: None,
            plantuml: None,
        }
    }
}

fn default_version() -> String {
    consts::sphinx::DEFAULT_VERSION.to_string()
}

fn default_base_url() -> String {
    consts::sphinx::DEFAULT_BASE_URL.to_string()
}

fn default_tool_name() -> String {
    consts::sphinx::DEFAULT_TOOL_NAME.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Request timeout in seconds, 0 disables the deadline
    pub timeout_secs: u64,
    pub proxy: Option<ProxyConfig>,
    /// Allowed TLS protocol versions ("TLSv1.2", "TLSv1.3"); empty means client default
    pub tls_versions: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: consts::network::DEFAULT_TIMEOUT_SECS,
            proxy: None,
            tls_versions: Vec::new(),
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Option<Duration> {
        non_zero_secs(self.timeout_secs)
    }

    /// Collapses the TLS allowlist into an inclusive (min, max) range
    pub fn tls_range(&self) -> Result<Option<(TlsVersion, TlsVersion)>> {
        let mut versions = Vec::with_capacity(self.tls_versions.len());
        for name in &self.tls_versions {
            let version = TlsVersion::parse(name).ok_or_else(|| {
                SphinxlabError::invalid_value(
                    "network.tls_versions",
                    format!("unsupported TLS protocol '{}' (expected TLSv1.2 or TLSv1.3)", name),
                )
            })?;
            versions.push(version);
        }

        let min = versions.iter().copied().min();
        let max = versions.iter().copied().max();
        Ok(min.zip(max))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub host: String,
    #[serde(default = "default_proxy_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub scheme: ProxyScheme,
}

fn default_proxy_port() -> u16 {
    consts::network::DEFAULT_PROXY_PORT
}

impl ProxyConfig {
    /// Proxy URL without credentials
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProxyScheme {
    #[default]
    Http,
    Https,
}

impl fmt::Display for ProxyScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyScheme::Http => write!(f, "http"),
            ProxyScheme::Https => write!(f, "https"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    Tls12,
    Tls13,
}

impl TlsVersion {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "TLSv1.2" => Some(TlsVersion::Tls12),
            "TLSv1.3" => Some(TlsVersion::Tls13),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Deadline for the Sphinx process in seconds, 0 waits forever
    pub timeout_secs: u64,
    /// Extra environment for the Sphinx process, applied last
    pub env: BTreeMap<String, String>,
}

impl ExecConfig {
    pub fn timeout(&self) -> Option<Duration> {
        non_zero_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub builder: String,
    pub tags: Vec<String>,
    pub verbose: bool,
    pub warnings_as_errors: bool,
    /// Rebuild everything instead of only changed files
    pub force: bool,
    /// Delete maven-site leftovers from the output directory after a build
    pub site_cruft: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from(consts::build::DEFAULT_SOURCE_DIR),
            output_dir: PathBuf::from(consts::build::DEFAULT_OUTPUT_DIR),
            builder: consts::build::DEFAULT_BUILDER.to_string(),
            tags: Vec::new(),
            verbose: true,
            warnings_as_errors: false,
            force: false,
            site_cruft: false,
        }
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Config {
    /// Reads and validates a sphinxlab.toml
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SphinxlabError::ConfigNotFound(path.to_path_buf()),
            _ => SphinxlabError::ConfigParseError(format!("{}: {}", path.display(), e)),
        })?;

        let mut config: Config = toml::from_str(&content)?;
        if let Some(dir) = path.parent() {
            config.anchor_paths(dir);
        }
        config.validate()?;
        Ok(config)
    }

    /// Resolves a relative `sphinx.cache_dir` against the config file's directory
    fn anchor_paths(&mut self, config_dir: &Path) {
        if let Some(cache_dir) = self.sphinx.cache_dir.as_mut() {
            if cache_dir.is_relative() {
                *cache_dir = config_dir.join(&*cache_dir);
            }
        }
    }

    /// Loads `dir/sphinxlab.toml` if present, otherwise the defaults
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(consts::CONFIG_FILE_NAME);
        if path.is_file() {
            tracing::debug!("Loading configuration from {}", path.display());
            Self::from_file(&path)
        } else {
            tracing::debug!("No {} in {}, using defaults", consts::CONFIG_FILE_NAME, dir.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        let sphinx = &self.sphinx;

        if sphinx.version.trim().is_empty() {
            return Err(SphinxlabError::invalid_value("sphinx.version", "must not be empty"));
        }
        if sphinx.version.chars().any(char::is_whitespace) {
            return Err(SphinxlabError::invalid_value(
                "sphinx.version",
                "must not contain whitespace",
            ));
        }
        if sphinx.tool_name.trim().is_empty() {
            return Err(SphinxlabError::invalid_value("sphinx.tool_name", "must not be empty"));
        }
        if sphinx.tool_name.contains(['/', '\\']) {
            return Err(SphinxlabError::invalid_value(
                "sphinx.tool_name",
                "must be a file name, not a path",
            ));
        }

        require_http_url("sphinx.base_url", &sphinx.base_url)?;
        if let Some(binary_url) = &sphinx.binary_url {
            require_http_url("sphinx.binary_url", binary_url)?;
        }

        if let Some(proxy) = &self.network.proxy {
            if proxy.host.trim().is_empty() {
                return Err(SphinxlabError::invalid_value(
                    "network.proxy.host",
                    "must not be empty",
                ));
            }
        }
        self.network.tls_range()?;

        if self.build.builder.trim().is_empty() {
            return Err(SphinxlabError::invalid_value("build.builder", "must not be empty"));
        }

        Ok(())
    }

    /// Cache root for Sphinx binaries
    ///
    /// `SPHINXLAB_CACHE_DIR` wins over `sphinx.cache_dir`, which wins over the
    /// per-user cache directory:
    /// - macOS: ~/Library/Caches/sphinxlab/sphinx
    /// - Linux: ~/.cache/sphinxlab/sphinx
    /// - Windows: %LOCALAPPDATA%\sphinxlab\sphinx
    pub fn cache_dir(&self) -> Result<PathBuf> {
        self.cache_dir_with_override(std::env::var_os(consts::CACHE_DIR_ENV))
    }

    fn cache_dir_with_override(&self, env_override: Option<OsString>) -> Result<PathBuf> {
        if let Some(dir) = env_override.filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        if let Some(dir) = &self.sphinx.cache_dir {
            return Ok(dir.clone());
        }

        let base = dirs::cache_dir().ok_or(SphinxlabError::CacheDirUnavailable)?;
        Ok(base.join("sphinxlab").join("sphinx"))
    }
}

fn require_http_url(field: &str, value: &str) -> Result<()> {
    let invalid = |reason: String| SphinxlabError::invalid_value(field, reason);
    let url = Url::parse(value)
        .map_err(|e| invalid(format!("'{}' is not a valid URL: {}", value, e)))?;

    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(()),
        _ => Err(invalid(format!("'{}' is not an absolute http(s) URL", value))),
    }
}
