/*!
 * OS-level probes: unix metadata extensions, mount-table lookup and
 * permission recovery
 */

use std::fs::Metadata;
use std::io;
use std::path::Path;

use crate::types::{FileId, FilesystemProfile};

/// Alignment applied when rounding the overwrite span up
pub const SPAN_ALIGN: u64 = 4096;

/// Bytes a single pass must cover for a file with the given lengths.
///
/// Covers whichever of the logical and allocated length is larger, rounded
/// up to the next 4 KiB boundary so final-block slack and blocks
/// preallocated past EOF are overwritten too. Zero stays zero: an empty,
/// unallocated file has no content to destroy.
pub fn overwrite_span(logical_len: u64, allocated_len: u64) -> u64 {
    let raw = logical_len.max(allocated_len);
    if raw == 0 {
        return 0;
    }
    (raw + SPAN_ALIGN - 1) / SPAN_ALIGN * SPAN_ALIGN
}

/// Stable (device, inode) identity of a file, when the platform has one
#[cfg(unix)]
pub fn file_id(meta: &Metadata) -> Option<FileId> {
    use std::os::unix::fs::MetadataExt;
    Some(FileId {
        dev: meta.dev(),
        ino: meta.ino(),
    })
}

#[cfg(not(unix))]
pub fn file_id(_meta: &Metadata) -> Option<FileId> {
    None
}

/// Bytes actually allocated to the file (st_blocks is in 512-byte units)
#[cfg(unix)]
pub fn allocated_len(meta: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.blocks() * 512
}

#[cfg(not(unix))]
pub fn allocated_len(meta: &Metadata) -> u64 {
    meta.len()
}

/// Number of directory entries referencing the file
#[cfg(unix)]
pub fn link_count(meta: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.nlink()
}

#[cfg(not(unix))]
pub fn link_count(_meta: &Metadata) -> u64 {
    1
}

/// Add the owner write bit to `path` without touching group or other bits
#[cfg(unix)]
pub fn make_user_writable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o200);
    std::fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
pub fn make_user_writable(path: &Path) -> io::Result<()> {
    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_readonly(false);
    std::fs::set_permissions(path, permissions)
}

/// Flush the parent directory of a just-removed entry, so the unlink
/// itself survives a crash. Best effort: filesystems that refuse
/// directory fsync only cost durability of the removal, not of the
/// overwrite.
#[cfg(unix)]
pub fn sync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = std::fs::File::open(parent) {
            if let Err(err) = dir.sync_data() {
                tracing::debug!(dir = %parent.display(), "parent directory sync failed: {}", err);
            }
        }
    }
}

#[cfg(not(unix))]
pub fn sync_parent_dir(_path: &Path) {}

/// Profile of the filesystem containing `path`, looked up in the mount
/// table. Falls back to an unknown profile when the table is unreadable,
/// so a failed probe degrades detection, never the run.
pub fn filesystem_profile(path: &Path) -> FilesystemProfile {
    match fstype_of(path) {
        Some(name) => FilesystemProfile::for_fstype(&name),
        None => FilesystemProfile::unknown(),
    }
}

/// Filesystem type of the longest mount point prefixing `path`
#[cfg(target_os = "linux")]
fn fstype_of(path: &Path) -> Option<String> {
    if let Ok(process) = procfs::process::Process::myself() {
        if let Ok(mounts) = process.mountinfo() {
            let mut best: Option<(usize, String)> = None;
            for mount in mounts.into_iter() {
                if path.starts_with(&mount.mount_point) {
                    let depth = mount.mount_point.components().count();
                    // >= so later entries win: overmounts shadow earlier ones
                    if best.as_ref().map_or(true, |(d, _)| depth >= *d) {
                        best = Some((depth, mount.fs_type.clone()));
                    }
                }
            }
            if let Some((_, fstype)) = best {
                return Some(fstype);
            }
        }
    }
    fstype_from_proc_mounts(path)
}

#[cfg(target_os = "linux")]
fn fstype_from_proc_mounts(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string("/proc/mounts").ok()?;
    let mut best: Option<(usize, String)> = None;
    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }
        let mount_point = Path::new(parts[1]);
        if path.starts_with(mount_point) {
            let depth = mount_point.components().count();
            if best.as_ref().map_or(true, |(d, _)| depth >= *d) {
                best = Some((depth, parts[2].to_string()));
            }
        }
    }
    best.map(|(_, fstype)| fstype)
}

#[cfg(not(target_os = "linux"))]
fn fstype_of(_path: &Path) -> Option<String> {
    None
}
