use crate::checksum::{ExpectedChecksum, digest_file};
use crate::http::{download, download_limited};
use crate::install::error::ProvisionError;
use crate::reference::BinaryReference;
use reqwest::blocking::Client;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, info, warn};

/// Prefix of in-flight download files inside a cache entry
pub const TEMP_PREFIX: &str = ".tmp-";

/// Largest accepted `.sha256` sidecar
pub const MAX_SIDECAR_BYTES: u64 = 4096;

/// Returns a verified local copy of `reference`, downloading it if needed
///
/// This function performs the complete installation workflow:
/// 1. Returns the cached binary if it already exists
/// 2. Creates the binary and checksum temp files next to the final location
/// 3. Downloads both
/// 4. Verifies the binary against the sidecar
/// 5. Renames the sidecar, then the binary, into place
///
/// Temp files are removed on every failure path.
///
/// # Arguments
///
/// * `client` - HTTP client from [`crate::http::build_client`]
/// * `reference` - What to download and where it lives in the cache
/// * `cache_root` - Root of the managed cache
///
/// # Returns
///
/// Path to the executable (`cache_root/cache_key/file_name`)
///
/// # Errors
///
/// Returns `ProvisionError` if:
/// - Either download fails
/// - The sidecar is malformed or does not match the binary
/// - File system operations fail
pub fn provision(
    client: &Client,
    reference: &BinaryReference,
    cache_root: &Path,
) -> Result<PathBuf, ProvisionError> {
    let binary_path = reference.binary_path(cache_root);
    if binary_path.is_file() {
        debug!("Using cached {}", binary_path.display());
        return Ok(binary_path);
    }

    let entry_dir = reference.entry_dir(cache_root);
    fs::create_dir_all(&entry_dir).map_err(|e| {
        ProvisionError::io(format!("create cache directory {}", entry_dir.display()), e)
    })?;

    info!(
        "{} is not cached yet, fetching {}",
        reference.file_name(),
        reference.binary_url()
    );

    // Dropping a TempPath deletes the file, so early returns clean up
    let binary_temp = create_temp(&entry_dir, true)?;
    let checksum_temp = create_temp(&entry_dir, false)?;

    download(client, reference.binary_url(), &binary_temp)?;
    download_limited(
        client,
        reference.checksum_url(),
        &checksum_temp,
        MAX_SIDECAR_BYTES,
    )?;

    verify(reference, &binary_temp, &checksum_temp)?;

    persist(checksum_temp, &reference.checksum_path(cache_root))?;
    persist(binary_temp, &binary_path)?;

    #[cfg(unix)]
    sync_dir(&entry_dir);

    info!("Installed {}", binary_path.display());
    Ok(binary_path)
}

/// Creates an empty temp file in `dir` and closes it
///
/// On Unix an executable temp file gets mode 0o755 (less the umask) when it
/// is created, so the installed binary never exists without its exec bits.
fn create_temp(dir: &Path, executable: bool) -> Result<TempPath, ProvisionError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(TEMP_PREFIX);

    #[cfg(unix)]
    if executable {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o755));
    }
    #[cfg(not(unix))]
    let _ = executable;

    let file = builder.tempfile_in(dir).map_err(|e| {
        ProvisionError::io(format!("create temporary file in {}", dir.display()), e)
    })?;
    Ok(file.into_temp_path())
}

fn verify(
    reference: &BinaryReference,
    binary: &Path,
    checksum: &Path,
) -> Result<(), ProvisionError> {
    let sidecar = fs::read(checksum)
        .map_err(|e| ProvisionError::io(format!("read {}", checksum.display()), e))?;
    let expected = ExpectedChecksum::parse_bytes(&sidecar).map_err(|source| {
        ProvisionError::ChecksumFormat {
            url: reference.checksum_url().clone(),
            source,
        }
    })?;

    let actual = digest_file(binary)
        .map_err(|e| ProvisionError::io(format!("hash {}", binary.display()), e))?;

    if !expected.matches(&actual) {
        let actual = hex::encode(actual);
        warn!(
            "Checksum mismatch for {}: expected {}, got {}",
            reference.binary_url(),
            expected.to_hex(),
            actual
        );
        return Err(ProvisionError::ChecksumMismatch {
            url: reference.binary_url().clone(),
            expected: expected.to_hex(),
            actual,
        });
    }

    debug!("Checksum verified for {}", reference.binary_url());
    Ok(())
}

/// Atomically renames `temp` over `target`
fn persist(temp: TempPath, target: &Path) -> Result<(), ProvisionError> {
    temp.persist(target).map_err(|e| {
        // e.path is dropped here, which removes the temp file
        ProvisionError::io(format!("install {}", target.display()), e.error)
    })
}

/// Flushes the renames to disk; failure only costs durability
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        debug!("Could not sync {}: {}", dir.display(), e);
    }
}
