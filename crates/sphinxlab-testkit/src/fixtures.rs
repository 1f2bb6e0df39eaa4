//! Fixture builders for fake Sphinx releases
//!
//! A "release" in tests is a small shell script plus its `.sha256` sidecar,
//! served by mockito instead of a real download host.

use sha2::{Digest, Sha256};

/// Builds a `/bin/sh` script with the given body
///
/// # Examples
///
/// ```rust
/// use sphinxlab_testkit::fake_sphinx_script;
///
/// let script = fake_sphinx_script("echo 1.2.3");
/// assert!(script.starts_with(b"#!/bin/sh\n"));
/// ```
pub fn fake_sphinx_script(body: &str) -> Vec<u8> {
    format!("#!/bin/sh\n{}\n", body).into_bytes()
}

/// Lower-case hex SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Sidecar content in `sha256sum` output format (`<hex>  <name>`)
pub fn sidecar_for(bytes: &[u8]) -> String {
    format!("{}  sphinx\n", sha256_hex(bytes))
}
