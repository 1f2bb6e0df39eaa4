//! Line separator normalization for generated text files
//!
//! Sphinx writes `\n` regardless of the host. Generated text files are
//! rewritten to use the platform separator so output is byte-identical to
//! what a native toolchain would produce.

use crate::error::{Result, SphinxlabError};
use std::fs;
use std::io;
use std::path::Path;

/// Line separator of the current platform
pub const PLATFORM_LINE_SEPARATOR: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// Extensions treated as text; `.map` files qualify only for CSS/JS source maps
const TEXT_EXTENSIONS: &[&str] = &["buildinfo", "html", "js", "svg", "txt", "xml"];

/// Rewrites every text file under `dir` to the platform line separator
///
/// Returns the number of files that were rewritten. A missing or non-directory
/// `dir` is not an error.
pub fn convert_line_separators(dir: &Path) -> Result<usize> {
    convert_line_separators_with(dir, PLATFORM_LINE_SEPARATOR.as_bytes())
}

/// Same as [`convert_line_separators`] with an explicit separator
pub fn convert_line_separators_with(dir: &Path, separator: &[u8]) -> Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }

    let mut converted = 0;
    for entry in walkdir::WalkDir::new(dir) {
        let entry = entry.map_err(|e| SphinxlabError::IoError(io::Error::from(e)))?;
        if !entry.file_type().is_file() || !is_text_file(entry.path()) {
            continue;
        }

        if convert_file(entry.path(), separator)? {
            converted += 1;
        }
    }

    tracing::debug!(
        "Normalized line separators in {} file(s) under {}",
        converted,
        dir.display()
    );
    Ok(converted)
}

/// Normalizes `\r\n`, `\r` and `\n` in one file to `separator`
///
/// Returns `false` without touching the file when it contains a NUL byte
/// (binary or UTF-16) or when nothing would change.
pub fn convert_file(path: &Path, separator: &[u8]) -> Result<bool> {
    let content = fs::read(path).map_err(|source| SphinxlabError::OutputConversionFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let Some(normalized) = normalize(&content, separator) else {
        return Ok(false);
    };
    if normalized == content {
        return Ok(false);
    }

    fs::write(path, normalized).map_err(|source| SphinxlabError::OutputConversionFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}

fn normalize(content: &[u8], separator: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(content.len());
    let mut last = 0u8;

    for &b in content {
        if b == 0 {
            return None;
        }

        if b == b'\n' {
            out.extend_from_slice(separator);
        } else {
            if last == b'\r' {
                out.extend_from_slice(separator);
            }
            if b != b'\r' {
                out.push(b);
            }
        }
        last = b;
    }

    if last == b'\r' {
        out.extend_from_slice(separator);
    }

    Some(out)
}

/// Whether a generated file should have its line separators normalized
pub fn is_text_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let Some((_, extension)) = name.rsplit_once('.') else {
        return false;
    };

    if extension == "map" {
        return name.ends_with(".css.map") || name.ends_with(".js.map");
    }
    TEXT_EXTENSIONS.contains(&extension)
}
