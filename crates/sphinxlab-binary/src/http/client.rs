//! HTTP client construction for release downloads

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT_ENCODING, CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA};
use reqwest::redirect::Policy;
use sphinxlab_core::config::{NetworkConfig, ProxyConfig, TlsVersion};
use std::time::Duration;

/// User agent sent with every request
pub const USER_AGENT: &str = "sphinxlab";

/// Default timeout for downloads (5 minutes for large binaries)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Connection settings, resolved from `[network]`
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request deadline; `None` waits forever
    pub timeout: Option<Duration>,
    pub proxy: Option<ProxyConfig>,
    /// Inclusive TLS protocol range; `None` keeps the client default
    pub tls: Option<(TlsVersion, TlsVersion)>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            proxy: None,
            tls: None,
        }
    }
}

impl ClientOptions {
    pub fn from_config(network: &NetworkConfig) -> sphinxlab_core::Result<Self> {
        Ok(Self {
            timeout: network.timeout(),
            proxy: network.proxy.clone(),
            tls: network.tls_range()?,
        })
    }
}

/// Builds the download client
///
/// Redirects are never followed automatically; [`crate::http::download`]
/// walks them itself so every hop can be validated. Idle connections are not
/// pooled, and proxies come only from `options` (never from `HTTP_PROXY` and
/// friends).
///
/// # Errors
///
/// Returns error if the proxy URL is malformed or the TLS backend rejects the
/// configuration
pub fn build_client(options: &ClientOptions) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(fixed_headers())
        .redirect(Policy::none())
        .pool_max_idle_per_host(0)
        .timeout(options.timeout);

    builder = match &options.proxy {
        Some(proxy) => builder.proxy(build_proxy(proxy)?),
        None => builder.no_proxy(),
    };

    if let Some((min, max)) = options.tls {
        builder = builder
            .min_tls_version(tls_version(min))
            .max_tls_version(tls_version(max));
    }

    builder.build()
}

fn build_proxy(config: &ProxyConfig) -> Result<reqwest::Proxy, reqwest::Error> {
    let proxy = reqwest::Proxy::all(config.url())?;
    Ok(match &config.username {
        Some(username) => proxy.basic_auth(username, config.password.as_deref().unwrap_or("")),
        None => proxy,
    })
}

/// Headers that keep intermediaries from serving stale or re-encoded bytes
fn fixed_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    headers
}

fn tls_version(version: TlsVersion) -> reqwest::tls::Version {
    match version {
        TlsVersion::Tls12 => reqwest::tls::Version::TLS_1_2,
        TlsVersion::Tls13 => reqwest::tls::Version::TLS_1_3,
    }
}
