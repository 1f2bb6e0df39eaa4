//! Defaults shared by the configuration model and the CLI

/// Name of the optional project configuration file
pub const CONFIG_FILE_NAME: &str = "sphinxlab.toml";

/// Environment variable overriding `sphinx.cache_dir`
pub const CACHE_DIR_ENV: &str = "SPHINXLAB_CACHE_DIR";

/// Sphinx binary release settings
pub mod sphinx {
    /// Release tag of the pinned Sphinx binary
    pub const DEFAULT_VERSION: &str = "v0.8.1";

    /// Base URL that release tags are appended to
    pub const DEFAULT_BASE_URL: &str = "https://github.com/trustin/sphinx-binary/releases/download";

    /// Base name of the executable inside a release
    pub const DEFAULT_TOOL_NAME: &str = "sphinx";
}

/// Network settings
pub mod network {
    /// Default request timeout in seconds (large binaries on slow links)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Default proxy port when none is given
    pub const DEFAULT_PROXY_PORT: u16 = 8080;
}

/// Documentation build settings
pub mod build {
    pub const DEFAULT_SOURCE_DIR: &str = "src/site/sphinx";
    pub const DEFAULT_OUTPUT_DIR: &str = "target/site";
    pub const DEFAULT_BUILDER: &str = "html";
}
