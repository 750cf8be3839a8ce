/*!
 * Pass execution: write every scheduled pass over a target's span and
 * make each one durable before the next begins
 */

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indicatif::ProgressBar;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::platform;
use crate::schedule::{Fill, OverwritePlan, Pass};
use crate::types::{FailureKind, Target};

/// Bytes written per syscall
const WRITE_CHUNK: usize = 1 << 20;

/// Zero-progress writes tolerated per chunk before the pass fails
const MAX_WRITE_RETRIES: usize = 3;

/// How an overwrite run ended
#[derive(Debug, PartialEq)]
pub enum OverwriteStatus {
    /// Every pass written and flushed to the device
    Complete,
    /// Stopped at a cancellation point; completed passes stay durable
    Cancelled,
    /// Stopped by an error; completed passes stay durable
    Failed {
        /// Taxonomy stage of the failure
        kind: FailureKind,
        /// Human-readable cause
        detail: String,
    },
}

/// Result of running one plan against one target
#[derive(Debug)]
pub struct OverwriteReport {
    /// Passes that completed and were flushed
    pub passes_completed: usize,
    /// Why execution stopped
    pub status: OverwriteStatus,
}

/// Executes overwrite plans against open files
pub struct PassWriter {
    /// Progress bar fed with bytes written
    progress: Arc<ProgressBar>,
    /// Cooperative cancellation flag, checked between passes only
    cancel: Arc<AtomicBool>,
}

impl PassWriter {
    /// Create a new pass writer
    pub fn new(progress: Arc<ProgressBar>, cancel: Arc<AtomicBool>) -> Self {
        Self { progress, cancel }
    }

    /// Run the plan against the target.
    ///
    /// The file is opened for writing without truncation, so the original
    /// allocation is overwritten in place instead of being released back
    /// to the filesystem. A pass counts as completed only after its bytes
    /// and metadata ordering have reached the device via sync_data.
    /// Cancellation is honored between passes; a started pass always runs
    /// to completion so no half-written pass is left behind.
    pub fn execute(&self, target: &Target, plan: &OverwritePlan) -> OverwriteReport {
        if plan.is_empty() {
            return OverwriteReport {
                passes_completed: 0,
                status: OverwriteStatus::Complete,
            };
        }

        let mut file = match open_for_overwrite(&target.path) {
            Ok(file) => file,
            Err(err) => {
                let kind = if err.kind() == io::ErrorKind::NotFound {
                    FailureKind::Classification
                } else {
                    FailureKind::Io
                };
                return OverwriteReport {
                    passes_completed: 0,
                    status: OverwriteStatus::Failed {
                        kind,
                        detail: format!("cannot open for writing: {}", err),
                    },
                };
            }
        };

        let mut completed = 0;
        for (index, pass) in plan.passes.iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                return OverwriteReport {
                    passes_completed: completed,
                    status: OverwriteStatus::Cancelled,
                };
            }
            tracing::trace!(
                path = %target.path.display(),
                pass = index + 1,
                pattern = %pass.pattern,
                "starting pass"
            );
            match self.write_pass(&mut file, pass, plan.span) {
                Ok(()) => completed += 1,
                Err(err) => {
                    return OverwriteReport {
                        passes_completed: completed,
                        status: OverwriteStatus::Failed {
                            kind: FailureKind::Io,
                            detail: format!("pass {} failed: {}", index + 1, err),
                        },
                    }
                }
            }
        }

        OverwriteReport {
            passes_completed: completed,
            status: OverwriteStatus::Complete,
        }
    }

    /// Write one pass over the whole span, then flush it to the device
    fn write_pass(&self, file: &mut File, pass: &Pass, span: u64) -> io::Result<()> {
        file.seek(SeekFrom::Start(0))?;

        let mut buffer = vec![0u8; (WRITE_CHUNK as u64).min(span) as usize];
        if let Fill::Byte(byte) = pass.fill {
            buffer.fill(byte);
        }

        let mut remaining = span;
        while remaining > 0 {
            let chunk_len = (buffer.len() as u64).min(remaining) as usize;
            let chunk = &mut buffer[..chunk_len];
            if pass.fill == Fill::Random {
                OsRng.fill_bytes(chunk);
            }
            write_chunk(file, chunk)?;
            self.progress.inc(chunk_len as u64);
            remaining -= chunk_len as u64;
        }

        file.flush()?;
        // sync_data is the durability point: only now does the pass count
        file.sync_data()?;
        Ok(())
    }
}

/// Write one chunk completely, resuming short writes from the last
/// confirmed offset. Interrupted writes are retried; a write that makes
/// no progress at all is retried a bounded number of times.
fn write_chunk(file: &mut File, chunk: &[u8]) -> io::Result<()> {
    let mut written = 0;
    let mut stalls = 0;
    while written < chunk.len() {
        match file.write(&chunk[written..]) {
            Ok(0) => {
                stalls += 1;
                if stalls >= MAX_WRITE_RETRIES {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "write made no progress",
                    ));
                }
            }
            Ok(count) => {
                written += count;
                stalls = 0;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Open for in-place writing, recovering once from a read-only file
fn open_for_overwrite(path: &Path) -> io::Result<File> {
    match OpenOptions::new().write(true).open(path) {
        Ok(file) => Ok(file),
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            platform::make_user_writable(path)?;
            OpenOptions::new().write(true).open(path)
        }
        Err(err) => Err(err),
    }
}
