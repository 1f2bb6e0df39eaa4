//! Verified installation of Sphinx binaries into the managed cache
//!
//! A cache entry is only ever created by renaming a fully downloaded and
//! verified temp file, so the presence of the binary is proof of a good
//! install. Concurrent installers race harmlessly: each writes its own temp
//! files and the last rename wins with identical content.

pub mod error;
pub mod provision;

pub use error::ProvisionError;
pub use provision::{MAX_SIDECAR_BYTES, TEMP_PREFIX, provision};
