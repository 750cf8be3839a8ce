/*!
 * Path classification: decide for each discovered entry whether it is a
 * destroyable file, a directory to expand, or something to leave alone
 */

use std::collections::HashMap;
use std::fs::{self, Metadata};
use std::path::Path;

use crate::error;
use crate::error::Result;
use crate::platform;
use crate::types::{FileKind, FilesystemProfile, SkipReason, Target};

/// What classification decided for one path
#[derive(Debug)]
pub enum Classified {
    /// Regular file, ready for scheduling
    File(Target),
    /// Directory, to be expanded by the walker
    Directory,
    /// Terminal skip decided without touching content
    Skip(SkipReason),
}

/// Cache of filesystem profiles keyed by device id, so the mount table is
/// parsed once per filesystem instead of once per file
#[derive(Debug, Default)]
pub struct ProfileCache {
    by_device: HashMap<u64, FilesystemProfile>,
}

impl ProfileCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    fn profile_for(&mut self, path: &Path, device: Option<u64>) -> FilesystemProfile {
        match device {
            Some(device) => self
                .by_device
                .entry(device)
                .or_insert_with(|| platform::filesystem_profile(path))
                .clone(),
            None => platform::filesystem_profile(path),
        }
    }
}

/// Classify one path.
///
/// Uses symlink_metadata so links are seen as links. With symlink
/// following enabled the link is resolved and the resolved path becomes
/// the target, so the real content is what gets destroyed; the link entry
/// itself is left behind. A dangling link under following is a
/// classification failure.
pub fn classify(
    path: &Path,
    follow_symlinks: bool,
    profiles: &mut ProfileCache,
) -> Result<Classified> {
    let meta = fs::symlink_metadata(path)
        .map_err(|e| error!(Classification, "cannot stat {}: {}", path.display(), e))?;
    let file_type = meta.file_type();

    if file_type.is_symlink() {
        if !follow_symlinks {
            return Ok(Classified::Skip(SkipReason::SymlinkNotFollowed));
        }
        let target_meta = fs::metadata(path)
            .map_err(|e| error!(Classification, "dangling symlink {}: {}", path.display(), e))?;
        if target_meta.is_dir() {
            return Ok(Classified::Directory);
        }
        if !target_meta.is_file() {
            return Ok(Classified::Skip(SkipReason::UnsupportedKind));
        }
        let resolved = fs::canonicalize(path).map_err(|e| {
            error!(Classification, "cannot resolve {}: {}", path.display(), e)
        })?;
        return Ok(Classified::File(build_target(&resolved, &target_meta, profiles)));
    }

    if file_type.is_dir() {
        return Ok(Classified::Directory);
    }
    if !file_type.is_file() {
        return Ok(Classified::Skip(SkipReason::UnsupportedKind));
    }
    // Canonical paths give every entry one spelling, so two names for
    // the same entry cannot race each other at unlink time
    let resolved = fs::canonicalize(path)
        .map_err(|e| error!(Classification, "cannot resolve {}: {}", path.display(), e))?;
    Ok(Classified::File(build_target(&resolved, &meta, profiles)))
}

/// Build the immutable target record for a regular file
fn build_target(path: &Path, meta: &Metadata, profiles: &mut ProfileCache) -> Target {
    let logical_len = meta.len();
    let allocated_len = platform::allocated_len(meta);
    let file_id = platform::file_id(meta);
    Target {
        path: path.to_path_buf(),
        kind: FileKind::RegularFile,
        logical_len,
        allocated_len,
        span: platform::overwrite_span(logical_len, allocated_len),
        file_id,
        nlink: platform::link_count(meta),
        profile: profiles.profile_for(path, file_id.map(|id| id.dev)),
    }
}
