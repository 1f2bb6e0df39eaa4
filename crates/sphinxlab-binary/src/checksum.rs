//! SHA-256 digests and `.sha256` sidecar parsing
//!
//! A sidecar holds exactly one line: 64 hex digits, optionally followed by
//! whitespace and free text (usually the file name, as `sha256sum` prints it).

use regex::Regex;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// Length of a SHA-256 digest in bytes
pub const DIGEST_LEN: usize = 32;

const CHUNK_SIZE: usize = 8192;

static SIDECAR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9a-fA-F]{64})(\s.*)?$").expect("sidecar pattern is a valid regex")
});

/// Incremental SHA-256 over a byte stream
///
/// Implements [`Write`] so it can sit at the end of `io::copy`.
#[derive(Debug, Clone, Default)]
pub struct Sha256Verifier {
    hasher: Sha256,
}

impl Sha256Verifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    pub fn finish(self) -> [u8; DIGEST_LEN] {
        self.hasher.finalize().into()
    }
}

impl Write for Sha256Verifier {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Streams a file through SHA-256 in fixed-size chunks
pub fn digest_file(path: &Path) -> io::Result<[u8; DIGEST_LEN]> {
    let mut file = File::open(path)?;
    let mut verifier = Sha256Verifier::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        verifier.update(&buffer[..bytes_read]);
    }

    Ok(verifier.finish())
}

/// Digest announced by a `.sha256` sidecar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedChecksum([u8; DIGEST_LEN]);

impl ExpectedChecksum {
    /// Parses sidecar text
    ///
    /// One trailing line break is tolerated; a second line of any kind is not.
    pub fn parse(text: &str) -> Result<Self, ChecksumFormatError> {
        let mut lines = text.lines();
        let Some(line) = lines.next() else {
            return Err(ChecksumFormatError::Empty);
        };

        let extra = lines.count();
        if extra > 0 {
            return Err(ChecksumFormatError::MultipleLines { count: extra + 1 });
        }

        let captures = SIDECAR_LINE
            .captures(line)
            .ok_or_else(|| ChecksumFormatError::InvalidLine {
                line: truncate_for_display(line),
            })?;

        let mut digest = [0u8; DIGEST_LEN];
        hex::decode_to_slice(&captures[1], &mut digest).map_err(|_| {
            ChecksumFormatError::InvalidLine {
                line: truncate_for_display(line),
            }
        })?;

        Ok(Self(digest))
    }

    /// Parses raw sidecar bytes, rejecting anything that is not UTF-8
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, ChecksumFormatError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ChecksumFormatError::NotText)?;
        Self::parse(text)
    }

    /// Both sides are 256-bit unsigned integers, so equal bytes means equal values
    pub fn matches(&self, digest: &[u8; DIGEST_LEN]) -> bool {
        self.0 == *digest
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for ExpectedChecksum {
    type Err = ChecksumFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn truncate_for_display(line: &str) -> String {
    const MAX: usize = 80;
    if line.chars().count() <= MAX {
        line.to_string()
    } else {
        let head: String = line.chars().take(MAX).collect();
        format!("{}...", head)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChecksumFormatError {
    #[error("checksum file is empty")]
    Empty,

    #[error("checksum file is not UTF-8 text")]
    NotText,

    #[error("checksum file has {count} lines, expected exactly one")]
    MultipleLines { count: usize },

    #[error("'{line}' does not start with 64 hexadecimal digits")]
    InvalidLine { line: String },
}
