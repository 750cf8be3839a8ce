/*!
 * Entry removal: hide the original name, remove the directory entry and
 * make the removal durable
 */

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error;
use crate::error::Result;
use crate::platform;
use crate::utils::random_name;

/// Attempts made to find an unused decoy name before giving up
const RENAME_ATTEMPTS: usize = 16;

/// Removes directory entries after their content has been destroyed
pub struct Unlinker<'a> {
    config: &'a Config,
}

impl<'a> Unlinker<'a> {
    /// Create a new unlinker
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Remove the entry for a fully overwritten file.
    ///
    /// With rename-before-unlink enabled the entry is first renamed to a
    /// random name of the same length, so the original file name stops
    /// being recoverable from the directory itself. A failed rename is
    /// logged and removal proceeds on the original name; removal is the
    /// step that must not silently fail.
    pub fn unlink(&self, path: &Path) -> Result<()> {
        let victim = if self.config.rename_before_unlink {
            match rename_to_decoy(path) {
                Ok(decoy) => {
                    // Commit the rename before removal: after a crash the
                    // surviving entry must be the decoy, not the original
                    platform::sync_parent_dir(&decoy);
                    decoy
                }
                Err(err) => {
                    tracing::debug!(path = %path.display(), "rename before unlink failed: {}", err);
                    path.to_path_buf()
                }
            }
        } else {
            path.to_path_buf()
        };

        remove_with_recovery(&victim)
            .map_err(|e| error!(Unlink, "cannot remove {}: {}", victim.display(), e))?;

        platform::sync_parent_dir(&victim);
        Ok(())
    }

    /// Remove a directory left empty by the run. Non-empty directories
    /// and removal errors leave the directory in place.
    pub fn remove_dir_if_empty(&self, path: &Path) -> bool {
        match fs::remove_dir(path) {
            Ok(()) => {
                platform::sync_parent_dir(path);
                true
            }
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                let recovered = path
                    .parent()
                    .map(|parent| platform::make_user_writable(parent).is_ok())
                    .unwrap_or(false);
                if recovered && fs::remove_dir(path).is_ok() {
                    platform::sync_parent_dir(path);
                    true
                } else {
                    false
                }
            }
            Err(err) => {
                tracing::trace!(path = %path.display(), "directory not removed: {}", err);
                false
            }
        }
    }
}

/// Rename the entry to an unused random name in the same directory.
///
/// The decoy keeps the original name's length so the rename can never be
/// refused for length reasons the original name already satisfied.
fn rename_to_decoy(path: &Path) -> io::Result<PathBuf> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "no parent directory"))?;
    let name_len = path
        .file_name()
        .map(|name| name.to_string_lossy().chars().count())
        .unwrap_or(12)
        .max(1);

    for _ in 0..RENAME_ATTEMPTS {
        let decoy = parent.join(random_name(name_len));
        // rename replaces existing files, so a taken name must be re-rolled
        if decoy.symlink_metadata().is_ok() {
            continue;
        }
        fs::rename(path, &decoy)?;
        return Ok(decoy);
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "no unused decoy name found",
    ))
}

/// Remove a file, recovering once from a write-protected parent directory
fn remove_with_recovery(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            if let Some(parent) = path.parent() {
                platform::make_user_writable(parent)?;
            }
            fs::remove_file(path)
        }
        Err(err) => Err(err),
    }
}
