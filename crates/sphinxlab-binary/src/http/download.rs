//! Streaming downloads with manually validated redirects
//!
//! Only absolute `http`/`https` redirect targets are followed, at most
//! [`MAX_REDIRECTS`] times. Anything but `200 OK` at the end of the chain is
//! an error. Progress is logged at most once per second.

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::LOCATION;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Redirect hops followed before giving up
pub const MAX_REDIRECTS: usize = 10;

const CHUNK_SIZE: usize = 8192;
const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Downloads `url` into `destination`, overwriting it
///
/// The file is fsynced before returning.
///
/// # Returns
///
/// Number of bytes written
///
/// # Errors
///
/// Returns `DownloadError` on transport failure, a non-200 final status, an
/// invalid or excessive redirect, a truncated body, or a local I/O failure
pub fn download(client: &Client, url: &Url, destination: &Path) -> Result<u64, DownloadError> {
    download_to(client, url, destination, None)
}

/// Like [`download`], but fails with [`DownloadError::TooLarge`] once the
/// body exceeds `limit` bytes
///
/// A `Content-Length` above the limit is rejected before any byte is read.
pub fn download_limited(
    client: &Client,
    url: &Url,
    destination: &Path,
    limit: u64,
) -> Result<u64, DownloadError> {
    download_to(client, url, destination, Some(limit))
}

fn download_to(
    client: &Client,
    url: &Url,
    destination: &Path,
    limit: Option<u64>,
) -> Result<u64, DownloadError> {
    let (response, final_url) = fetch(client, url)?;

    if let (Some(limit), Some(length)) = (limit, response.content_length()) {
        if length > limit {
            return Err(DownloadError::TooLarge {
                url: final_url,
                limit,
            });
        }
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(destination)
        .map_err(|source| DownloadError::Io {
            url: url.clone(),
            operation: format!("open {}", destination.display()),
            source,
        })?;

    let downloaded = stream_body(response, &final_url, &mut file, limit)?;

    file.sync_all().map_err(|source| DownloadError::Io {
        url: url.clone(),
        operation: format!("sync {}", destination.display()),
        source,
    })?;

    info!("Downloaded {} ({} bytes)", final_url, downloaded);
    Ok(downloaded)
}

/// Sends GET requests until a non-redirect response arrives
///
/// Returns the response together with the URL that produced it.
fn fetch(client: &Client, url: &Url) -> Result<(Response, Url), DownloadError> {
    let mut current = url.clone();
    let mut redirects = 0;

    loop {
        debug!("GET {}", current);
        let response = client
            .get(current.as_str())
            .send()
            .map_err(|e| request_error(&current, e))?;
        let status = response.status();

        if is_redirect(status) {
            let target = redirect_target(&current, &response)?;
            if redirects >= MAX_REDIRECTS {
                return Err(DownloadError::TooManyRedirects {
                    url: url.clone(),
                    limit: MAX_REDIRECTS,
                });
            }
            redirects += 1;
            debug!("{} redirected ({}) to {}", current, status.as_u16(), target);
            current = target;
            continue;
        }

        if status != StatusCode::OK {
            return Err(DownloadError::UnexpectedStatus {
                url: current,
                status: status.as_u16(),
            });
        }

        return Ok((response, current));
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

fn redirect_target(from: &Url, response: &Response) -> Result<Url, DownloadError> {
    let invalid = |reason: String| DownloadError::InvalidRedirect {
        url: from.clone(),
        status: response.status().as_u16(),
        reason,
    };

    let location = response
        .headers()
        .get(LOCATION)
        .ok_or_else(|| invalid("missing Location header".to_string()))?
        .to_str()
        .map_err(|_| invalid("Location header is not valid ASCII".to_string()))?;

    let target = Url::parse(location).map_err(|e| match e {
        url::ParseError::RelativeUrlWithoutBase => {
            invalid(format!("relative Location '{}' is not allowed", location))
        }
        other => invalid(format!("unparsable Location '{}': {}", location, other)),
    })?;

    match target.scheme() {
        "http" | "https" => Ok(target),
        scheme => Err(invalid(format!(
            "Location '{}' uses unsupported scheme '{}'",
            location, scheme
        ))),
    }
}

fn stream_body(
    mut response: Response,
    url: &Url,
    file: &mut File,
    limit: Option<u64>,
) -> Result<u64, DownloadError> {
    let total = response.content_length();
    let mut progress = Progress::new(url, total);
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let bytes_read = response
            .read(&mut buffer)
            .map_err(|e| read_error(url, e))?;
        if bytes_read == 0 {
            break;
        }
        if let Some(limit) = limit {
            if progress.downloaded + bytes_read as u64 > limit {
                return Err(DownloadError::TooLarge {
                    url: url.clone(),
                    limit,
                });
            }
        }

        file.write_all(&buffer[..bytes_read])
            .map_err(|source| DownloadError::Io {
                url: url.clone(),
                operation: "write downloaded bytes".to_string(),
                source,
            })?;

        progress.advance(bytes_read as u64);
    }

    if let Some(expected) = total {
        if progress.downloaded != expected {
            return Err(DownloadError::SizeMismatch {
                url: url.clone(),
                expected,
                actual: progress.downloaded,
            });
        }
    }

    Ok(progress.downloaded)
}

/// Throttled "downloaded / total" logging
struct Progress<'a> {
    url: &'a Url,
    total: Option<u64>,
    downloaded: u64,
    last_report: Instant,
}

impl<'a> Progress<'a> {
    fn new(url: &'a Url, total: Option<u64>) -> Self {
        info!("Downloading {} ({})", url, describe_total(total));
        Self {
            url,
            total,
            downloaded: 0,
            last_report: Instant::now(),
        }
    }

    fn advance(&mut self, bytes: u64) {
        self.downloaded += bytes;
        if self.last_report.elapsed() >= PROGRESS_INTERVAL {
            self.last_report = Instant::now();
            info!(
                "{}: {} / {}",
                self.url,
                self.downloaded,
                describe_total(self.total)
            );
        }
    }
}

fn describe_total(total: Option<u64>) -> String {
    match total {
        Some(bytes) => format!("{} bytes", bytes),
        None => "unknown".to_string(),
    }
}

fn request_error(url: &Url, error: reqwest::Error) -> DownloadError {
    if error.is_timeout() {
        DownloadError::TimedOut { url: url.clone() }
    } else {
        DownloadError::Request {
            url: url.clone(),
            source: error.without_url(),
        }
    }
}

fn read_error(url: &Url, error: io::Error) -> DownloadError {
    if error.kind() == io::ErrorKind::TimedOut {
        DownloadError::TimedOut { url: url.clone() }
    } else {
        DownloadError::Io {
            url: url.clone(),
            operation: "read from HTTP response".to_string(),
            source: error,
        }
    }
}

/// Download errors
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out")]
    TimedOut { url: Url },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { url: Url, status: u16 },

    #[error("invalid redirect ({status}) from {url}: {reason}")]
    InvalidRedirect { url: Url, status: u16, reason: String },

    #[error("too many redirects (more than {limit}) starting at {url}")]
    TooManyRedirects { url: Url, limit: usize },

    #[error("response from {url} exceeds {limit} bytes")]
    TooLarge { url: Url, limit: u64 },

    #[error("size mismatch for {url}: expected {expected} bytes, got {actual} bytes")]
    SizeMismatch { url: Url, expected: u64, actual: u64 },

    #[error("failed to {operation} for {url}: {source}")]
    Io {
        url: Url,
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl DownloadError {
    pub fn url(&self) -> &Url {
        match self {
            DownloadError::Request { url, .. }
            | DownloadError::TimedOut { url }
            | DownloadError::UnexpectedStatus { url, .. }
            | DownloadError::InvalidRedirect { url, .. }
            | DownloadError::TooManyRedirects { url, .. }
            | DownloadError::TooLarge { url, .. }
            | DownloadError::SizeMismatch { url, .. }
            | DownloadError::Io { url, .. } => url,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, DownloadError::TimedOut { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::client::{ClientOptions, build_client};
    use std::fs;

    fn client() -> Client {
        build_client(&ClientOptions::default()).unwrap()
    }

    fn url(server: &mockito::Server, path: &str) -> Url {
        Url::parse(&format!("{}{}", server.url(), path)).unwrap()
    }

    #[test]
    fn test_download_writes_body() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/v1/sphinx.linux-x86_64")
            .with_status(200)
            .with_body(b"binary-content")
            .create();

        let temp = tempfile::TempDir::new().unwrap();
        let dest = temp.path().join("sphinx");
        let bytes = download(&client(), &url(&server, "/v1/sphinx.linux-x86_64"), &dest).unwrap();

        mock.assert();
        assert_eq!(bytes, 14);
        assert_eq!(fs::read(&dest).unwrap(), b"binary-content");
    }

    #[test]
    fn test_download_sends_fixed_headers() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/asset")
            .match_header("user-agent", "sphinxlab")
            .match_header("cache-control", "no-cache, no-store")
            .match_header("pragma", "no-cache")
            .match_header("accept-encoding", "identity")
            .with_status(200)
            .with_body("ok")
            .create();

        let temp = tempfile::TempDir::new().unwrap();
        download(&client(), &url(&server, "/asset"), &temp.path().join("a")).unwrap();
        mock.assert();
    }

    #[test]
    fn test_download_follows_absolute_redirect() {
        let mut server = mockito::Server::new();
        let target = format!("{}/cdn/sphinx", server.url());
        let redirect = server
            .mock("GET", "/releases/sphinx")
            .with_status(302)
            .with_header("location", &target)
            .create();
        let asset = server
            .mock("GET", "/cdn/sphinx")
            .with_status(200)
            .with_body("redirected")
            .create();

        let temp = tempfile::TempDir::new().unwrap();
        let dest = temp.path().join("sphinx");
        download(&client(), &url(&server, "/releases/sphinx"), &dest).unwrap();

        redirect.assert();
        asset.assert();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "redirected");
    }

    #[test]
    fn test_download_follows_each_redirect_status() {
        for status in [301, 303, 307, 308] {
            let mut server = mockito::Server::new();
            let target = format!("{}/final", server.url());
            server
                .mock("GET", "/start")
                .with_status(status)
                .with_header("location", &target)
                .create();
            server
                .mock("GET", "/final")
                .with_status(200)
                .with_body("done")
                .create();

            let temp = tempfile::TempDir::new().unwrap();
            let dest = temp.path().join("out");
            download(&client(), &url(&server, "/start"), &dest)
                .unwrap_or_else(|e| panic!("status {} should be followed: {}", status, e));
            assert_eq!(fs::read_to_string(&dest).unwrap(), "done");
        }
    }

    #[test]
    fn test_redirect_without_location_is_invalid() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/asset").with_status(302).create();

        let temp = tempfile::TempDir::new().unwrap();
        let err = download(&client(), &url(&server, "/asset"), &temp.path().join("a")).unwrap_err();
        assert!(
            matches!(err, DownloadError::InvalidRedirect { status: 302, .. }),
            "unexpected error: {}",
            err
        );
    }

    #[test]
    fn test_relative_redirect_is_invalid() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/asset")
            .with_status(301)
            .with_header("location", "/elsewhere")
            .create();
        let elsewhere = server.mock("GET", "/elsewhere").expect(0).create();

        let temp = tempfile::TempDir::new().unwrap();
        let err = download(&client(), &url(&server, "/asset"), &temp.path().join("a")).unwrap_err();

        assert!(matches!(err, DownloadError::InvalidRedirect { .. }));
        assert!(err.to_string().contains("relative Location"));
        elsewhere.assert();
    }

    #[test]
    fn test_non_http_redirect_is_invalid() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/asset")
            .with_status(307)
            .with_header("location", "ftp://example.test/sphinx")
            .create();

        let temp = tempfile::TempDir::new().unwrap();
        let err = download(&client(), &url(&server, "/asset"), &temp.path().join("a")).unwrap_err();
        assert!(matches!(err, DownloadError::InvalidRedirect { .. }));
    }

    #[test]
    fn test_redirect_loop_hits_limit() {
        let mut server = mockito::Server::new();
        let own = format!("{}/loop", server.url());
        let looping = server
            .mock("GET", "/loop")
            .with_status(302)
            .with_header("location", &own)
            .expect(MAX_REDIRECTS + 1)
            .create();

        let temp = tempfile::TempDir::new().unwrap();
        let err = download(&client(), &url(&server, "/loop"), &temp.path().join("a")).unwrap_err();

        assert!(matches!(
            err,
            DownloadError::TooManyRedirects { limit: MAX_REDIRECTS, .. }
        ));
        looping.assert();
    }

    #[test]
    fn test_not_found_is_unexpected_status() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/missing").with_status(404).create();

        let temp = tempfile::TempDir::new().unwrap();
        let dest = temp.path().join("a");
        let err = download(&client(), &url(&server, "/missing"), &dest).unwrap_err();

        assert!(matches!(err, DownloadError::UnexpectedStatus { status: 404, .. }));
        assert!(!dest.exists(), "nothing should be written for a failed request");
    }

    #[test]
    fn test_other_success_codes_are_rejected() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/partial").with_status(206).with_body("x").create();

        let temp = tempfile::TempDir::new().unwrap();
        let err = download(&client(), &url(&server, "/partial"), &temp.path().join("a")).unwrap_err();
        assert!(matches!(err, DownloadError::UnexpectedStatus { status: 206, .. }));
    }

    #[test]
    fn test_limited_download_rejects_large_content_length() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/big.sha256")
            .with_status(200)
            .with_body(vec![b'a'; 5000])
            .create();

        let temp = tempfile::TempDir::new().unwrap();
        let dest = temp.path().join("a");
        let err = download_limited(&client(), &url(&server, "/big.sha256"), &dest, 4096)
            .unwrap_err();

        assert!(matches!(err, DownloadError::TooLarge { limit: 4096, .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn test_limited_download_stops_unbounded_chunked_body() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/stream.sha256")
            .with_status(200)
            .with_chunked_body(|w| {
                for _ in 0..64 {
                    w.write_all(&[b'f'; 1024])?;
                }
                Ok(())
            })
            .create();

        let temp = tempfile::TempDir::new().unwrap();
        let err = download_limited(
            &client(),
            &url(&server, "/stream.sha256"),
            &temp.path().join("a"),
            4096,
        )
        .unwrap_err();

        assert!(matches!(err, DownloadError::TooLarge { .. }));
    }

    #[test]
    fn test_limited_download_accepts_small_body() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/ok.sha256")
            .with_status(200)
            .with_body("abc\n")
            .create();

        let temp = tempfile::TempDir::new().unwrap();
        let dest = temp.path().join("a");
        let bytes = download_limited(&client(), &url(&server, "/ok.sha256"), &dest, 4096).unwrap();
        assert_eq!(bytes, 4);
    }

    #[test]
    fn test_connection_refused_is_request_error() {
        // Bind and drop to obtain a port nothing listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let target = Url::parse(&format!("http://127.0.0.1:{}/sphinx", port)).unwrap();

        let temp = tempfile::TempDir::new().unwrap();
        let err = download(&client(), &target, &temp.path().join("a")).unwrap_err();

        assert!(matches!(err, DownloadError::Request { .. }));
        assert_eq!(err.url(), &target);
    }
}
