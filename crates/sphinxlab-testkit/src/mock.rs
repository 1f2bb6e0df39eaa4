//! Mock server infrastructure for testing
//!
//! This module provides a shared mockito server for parallel test execution
//! plus helpers that mount a fake release (binary + checksum sidecar).

use lazy_static::lazy_static;
use mockito::{Mock, Server, ServerGuard};
use std::sync::Mutex;

lazy_static! {
    /// Global shared mockito server for all tests
    ///
    /// This server is initialized once and shared across all test threads.
    /// Tests must mount their mocks under unique paths.
    pub static ref SHARED_MOCK_SERVER: Mutex<ServerGuard> = Mutex::new(Server::new());
}

/// Get reference to shared mock server
///
/// Acquire the lock only while creating mocks; the server keeps answering
/// requests while the guard is released.
///
/// # Examples
///
/// ```no_run
/// use sphinxlab_testkit::get_shared_mock_server;
///
/// let (mock, url) = {
///     let mut server = get_shared_mock_server();
///     let mock = server.mock("GET", "/unique-path-v1/resource")
///         .with_status(200)
///         .create();
///     (mock, server.url())
/// }; // Lock released here
/// ```
pub fn get_shared_mock_server() -> std::sync::MutexGuard<'static, ServerGuard> {
    // A panicking test must not take the shared server down with it
    SHARED_MOCK_SERVER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mocks for one mounted release
pub struct ReleaseMocks {
    pub binary: Mock,
    pub checksum: Mock,
}

impl ReleaseMocks {
    /// Asserts both mocks received their expected number of requests
    pub fn assert(&self) {
        self.binary.assert();
        self.checksum.assert();
    }
}

/// Mounts `binary_path` and `{binary_path}.sha256` on `server`
///
/// `hits` is the number of requests each mock expects.
pub fn mock_release(
    server: &mut ServerGuard,
    binary_path: &str,
    body: &[u8],
    sidecar: &str,
    hits: usize,
) -> ReleaseMocks {
    let binary = server
        .mock("GET", binary_path)
        .with_status(200)
        .with_header("content-type", "application/octet-stream")
        .with_body(body)
        .expect(hits)
        .create();

    let checksum = server
        .mock("GET", format!("{}.sha256", binary_path).as_str())
        .with_status(200)
        .with_header("content-type", "text/plain")
        .with_body(sidecar)
        .expect(hits)
        .create();

    ReleaseMocks { binary, checksum }
}
