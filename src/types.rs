/*!
 * Core types and data structures for the obliterate engine
 */

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Kind of a classified filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileKind {
    /// Regular file whose content will be overwritten and unlinked
    RegularFile,
    /// Directory; never destroyed itself, only expanded
    Directory,
    /// Symbolic link; skipped unless symlink following is enabled
    Symlink,
    /// FIFO, socket, device node or anything else we refuse to touch
    Unsupported,
}

/// Platform-stable file identity used for hard-link deduplication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FileId {
    /// Device number of the containing filesystem
    pub dev: u64,
    /// Inode number on that device
    pub ino: u64,
}

/// Overwrite pattern selectable per pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum PatternKind {
    /// Every byte 0x00
    Zeros,
    /// Every byte 0xFF
    Ones,
    /// Cryptographically random bytes
    Random,
    /// Bitwise complement of the previous pass's fixed byte
    Complementary,
}

/// How certain the engine is that a completed overwrite actually
/// destroyed the on-disk data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    /// No filesystem feature known to defeat in-place overwriting was detected
    Full,
    /// Copy-on-write or journaling may have preserved old blocks elsewhere,
    /// or the filesystem could not be identified at all
    Degraded,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::Full => write!(f, "full"),
            Confidence::Degraded => write!(f, "degraded"),
        }
    }
}

/// Best-effort capabilities of the filesystem holding a target.
///
/// Detection is heuristic (mount-table lookup); the profile is a confidence
/// hint attached to outcomes, never a hard guarantee.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilesystemProfile {
    /// Filesystem type name as reported by the mount table, if known
    pub fstype: Option<String>,
    /// Overwrites may land on fresh blocks, leaving old data behind
    pub copy_on_write: bool,
    /// Journal replay may retain stale copies of overwritten content
    pub journaled: bool,
    /// Files may have unallocated holes smaller than their logical length
    pub supports_sparse: bool,
}

impl FilesystemProfile {
    /// Profile for a filesystem type name from the mount table
    pub fn for_fstype(name: &str) -> Self {
        let copy_on_write = matches!(
            name,
            "btrfs" | "zfs" | "bcachefs" | "nilfs2" | "f2fs" | "overlay" | "overlayfs"
        );
        let journaled = matches!(
            name,
            "ext3" | "ext4" | "xfs" | "jfs" | "reiserfs" | "ntfs" | "ntfs3"
        );
        let supports_sparse = !matches!(name, "vfat" | "msdos" | "exfat" | "fat");
        Self {
            fstype: Some(name.to_string()),
            copy_on_write,
            journaled,
            supports_sparse,
        }
    }

    /// Profile when the filesystem could not be identified
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Confidence an overwrite on this filesystem deserves. An
    /// unidentified filesystem cannot be vouched for.
    pub fn confidence(&self) -> Confidence {
        if self.fstype.is_none() || self.copy_on_write || self.journaled {
            Confidence::Degraded
        } else {
            Confidence::Full
        }
    }
}

/// A classified destruction target. Immutable once built.
#[derive(Debug, Clone)]
pub struct Target {
    /// Absolute path of the directory entry
    pub path: PathBuf,
    /// Classified kind
    pub kind: FileKind,
    /// Logical (apparent) length in bytes
    pub logical_len: u64,
    /// Allocated length in bytes (st_blocks * 512 on unix)
    pub allocated_len: u64,
    /// Bytes each pass must cover: max(logical, allocated) rounded up
    /// to a 4 KiB boundary, so final-block slack and preallocated blocks
    /// past EOF are overwritten too
    pub span: u64,
    /// Identity for hard-link dedup; None when the platform cannot supply one
    pub file_id: Option<FileId>,
    /// Hard-link count at classification time
    pub nlink: u64,
    /// Capabilities of the containing filesystem
    pub profile: FilesystemProfile,
}

/// Why a path was skipped rather than destroyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Directories are only expanded, never overwritten
    Directory,
    /// Symbolic link and symlink following is disabled
    SymlinkNotFollowed,
    /// FIFO, socket, device node or other unsupported kind
    UnsupportedKind,
    /// Matched a user exclude pattern
    Excluded,
    /// The batch was cancelled before this target started
    Cancelled,
    /// Dry run: reported instead of destroyed
    DryRun,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Directory => write!(f, "directory"),
            SkipReason::SymlinkNotFollowed => write!(f, "symlink not followed"),
            SkipReason::UnsupportedKind => write!(f, "unsupported file kind"),
            SkipReason::Excluded => write!(f, "excluded by pattern"),
            SkipReason::Cancelled => write!(f, "cancelled before start"),
            SkipReason::DryRun => write!(f, "dry run, would destroy"),
        }
    }
}

/// Which stage of the taxonomy a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    /// Input path missing or unreadable
    Input,
    /// Path vanished or could not be classified
    Classification,
    /// Write or flush failure during overwriting
    Io,
    /// Rename or removal failure after a completed overwrite
    Unlink,
    /// Per-entry error while expanding a directory
    Traversal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Input => write!(f, "input"),
            FailureKind::Classification => write!(f, "classification"),
            FailureKind::Io => write!(f, "I/O"),
            FailureKind::Unlink => write!(f, "unlink"),
            FailureKind::Traversal => write!(f, "traversal"),
        }
    }
}

/// Terminal per-path result. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Every pass completed and was durably flushed, every entry removed
    Destroyed {
        /// Downgraded when the filesystem can defeat in-place overwriting
        confidence: Confidence,
    },
    /// Content is degraded but not certifiably unrecoverable, or the
    /// overwrite finished and the directory entry could not be removed
    PartiallyOverwritten {
        /// Passes that completed and were flushed
        passes_completed: usize,
        /// Passes the plan called for
        passes_planned: usize,
        /// Whether the directory entry was removed anyway
        entry_removed: bool,
        /// Human-readable cause
        detail: String,
    },
    /// Not a destroyable target, or excluded by policy
    Skipped {
        /// Why it was skipped
        reason: SkipReason,
    },
    /// The target could not be destroyed at all
    Failed {
        /// Taxonomy stage of the failure
        kind: FailureKind,
        /// Human-readable cause
        detail: String,
    },
}

impl Outcome {
    /// True only for a fully destroyed target
    pub fn is_destroyed(&self) -> bool {
        matches!(self, Outcome::Destroyed { .. })
    }

    /// Short label for report tables
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Destroyed { .. } => "destroyed",
            Outcome::PartiallyOverwritten { .. } => "partial",
            Outcome::Skipped { .. } => "skipped",
            Outcome::Failed { .. } => "failed",
        }
    }

    /// Detail column for report tables
    pub fn detail(&self) -> String {
        match self {
            Outcome::Destroyed { confidence } => match confidence {
                Confidence::Full => String::new(),
                Confidence::Degraded => {
                    "confidence degraded (CoW, journaled or unidentified filesystem)".into()
                }
            },
            Outcome::PartiallyOverwritten {
                passes_completed,
                passes_planned,
                entry_removed,
                detail,
            } => {
                let entry = if *entry_removed {
                    "entry removed"
                } else {
                    "entry still present"
                };
                format!(
                    "{}/{} passes, {}: {}",
                    passes_completed, passes_planned, entry, detail
                )
            }
            Outcome::Skipped { reason } => reason.to_string(),
            Outcome::Failed { kind, detail } => format!("{} error: {}", kind, detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cow_filesystem_degrades_confidence() {
        let profile = FilesystemProfile::for_fstype("btrfs");
        assert!(profile.copy_on_write);
        assert_eq!(profile.confidence(), Confidence::Degraded);
    }

    #[test]
    fn journaled_filesystem_degrades_confidence() {
        let profile = FilesystemProfile::for_fstype("ext4");
        assert!(profile.journaled);
        assert!(!profile.copy_on_write);
        assert_eq!(profile.confidence(), Confidence::Degraded);
    }

    #[test]
    fn plain_filesystem_keeps_full_confidence() {
        for fstype in ["ext2", "vfat", "tmpfs"] {
            let profile = FilesystemProfile::for_fstype(fstype);
            assert_eq!(profile.confidence(), Confidence::Full, "{}", fstype);
        }
    }

    #[test]
    fn unidentified_filesystem_degrades_confidence() {
        assert_eq!(
            FilesystemProfile::unknown().confidence(),
            Confidence::Degraded
        );
    }

    #[test]
    fn fat_family_has_no_sparse_support() {
        assert!(!FilesystemProfile::for_fstype("vfat").supports_sparse);
        assert!(FilesystemProfile::for_fstype("ext4").supports_sparse);
    }

    #[test]
    fn outcome_labels_are_stable() {
        let destroyed = Outcome::Destroyed {
            confidence: Confidence::Full,
        };
        assert!(destroyed.is_destroyed());
        assert_eq!(destroyed.label(), "destroyed");
        assert_eq!(destroyed.detail(), "");

        let skipped = Outcome::Skipped {
            reason: SkipReason::Directory,
        };
        assert!(!skipped.is_destroyed());
        assert_eq!(skipped.detail(), "directory");
    }
}
