//! HTTP plumbing for release downloads

pub mod client;
pub mod download;

pub use client::{ClientOptions, USER_AGENT, build_client};
pub use download::{DownloadError, MAX_REDIRECTS, download, download_limited};
