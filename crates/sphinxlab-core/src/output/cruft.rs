//! Removal of maven-site leftovers from a Sphinx output directory

use crate::error::Result;
use std::fs;
use std::io;
use std::path::Path;

/// Files and directories left behind by maven-site-plugin, in deletion order
///
/// Directories are listed after their contents so they are empty by the
/// time they are reached.
pub const CRUFTS: &[&str] = &[
    "css/maven-base.css",
    "css/maven-theme.css",
    "css/print.css",
    "css/site.css",
    "css",
    "images/logos/build-by-maven-black.png",
    "images/logos/build-by-maven-white.png",
    "images/logos/maven-feather.png",
    "images/logos",
    "images/collapsed.gif",
    "images/expanded.gif",
    "images/external.png",
    "images/icon_error_sml.gif",
    "images/icon_info_sml.gif",
    "images/icon_success_sml.gif",
    "images/icon_warning_sml.gif",
    "images/newwindow.png",
    "images",
];

/// Deletes every [`CRUFTS`] entry under `output_dir`
///
/// Missing entries and directories that still hold other files are left
/// alone. Returns the number of entries removed.
pub fn delete_cruft(output_dir: &Path) -> Result<usize> {
    let mut removed = 0;

    for cruft in CRUFTS {
        let path = cruft
            .split('/')
            .fold(output_dir.to_path_buf(), |acc, segment| acc.join(segment));

        let result = if path.is_dir() {
            fs::remove_dir(&path)
        } else {
            fs::remove_file(&path)
        };

        match result {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) if path.is_dir() => {
                // Sphinx put its own files here
                tracing::debug!("Keeping non-empty directory {}: {}", path.display(), e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::debug!("Removed {} cruft entries from {}", removed, output_dir.display());
    Ok(removed)
}
