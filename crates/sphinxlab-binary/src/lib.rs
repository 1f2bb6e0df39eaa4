//! Sphinx binary provisioning and supervised execution for sphinxlab.
//!
//! This crate downloads a version-pinned, prebuilt Sphinx executable for the
//! current platform, verifies it against its published SHA-256 sidecar,
//! installs it atomically into a per-user cache, and runs it.
//!
//! # Architecture
//!
//! - [`platform`]: `{os}-{arch}` classifier of the host
//! - [`reference`]: Download URLs and cache layout for one binary
//! - [`checksum`]: SHA-256 digests and sidecar parsing
//! - [`http`]: Client construction and redirect-validating downloads
//! - [`install`]: Verified, atomic installation into the cache
//! - [`exec`]: Process supervision with streamed output
//! - [`runner`]: Ties the above together
//!
//! # Provisioning Flow
//!
//! ```text
//! SphinxRunner::run()
//!     ↓
//! 1. Reject empty argument list
//!     ↓
//! 2. {cache_root}/{cache_key}/{tool}.{classifier} exists?
//!     → yes: use it
//!     ↓ (no)
//! 3. Download binary and .sha256 sidecar to .tmp-* files
//!     ↓
//! 4. Verify digest (mismatch: delete temps, fail)
//!     ↓
//! 5. Rename sidecar, then binary, into place
//!     ↓
//! 6. Spawn with LANG/LC_ALL/TZ/plantuml overlay, relay output, wait
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sphinxlab_binary::{RunnerOptions, SphinxRunner};
//! use std::path::Path;
//!
//! # fn main() -> sphinxlab_binary::Result<()> {
//! let runner = SphinxRunner::new(RunnerOptions::new("v0.8.1", "/tmp/sphinx-cache"))?;
//! let exit_code = runner.run(Path::new("."), &["--version".to_string()])?;
//! println!("Exit code: {}", exit_code);
//! # Ok(())
//! # }
//! ```
//!
//! # Managed Cache Structure
//!
//! - **macOS**: `~/Library/Caches/sphinxlab/sphinx/{version}/sphinx.osx-x86_64`
//! - **Linux**: `~/.cache/sphinxlab/sphinx/{version}/sphinx.linux-x86_64`
//! - **Windows**: `%LOCALAPPDATA%\sphinxlab\sphinx\{version}\sphinx.windows-x86_64.exe`

pub mod checksum;
pub mod error;
pub mod exec;
pub mod http;
pub mod install;
pub mod platform;
pub mod reference;
pub mod runner;

pub use error::{Error, ErrorKind, Result};
pub use exec::{ExecError, ExecOptions, OutputSinks, run_binary};
pub use install::{ProvisionError, provision};
pub use platform::{Arch, Os, Platform, PlatformError};
pub use reference::BinaryReference;
pub use runner::{RunnerOptions, SphinxRunner};
