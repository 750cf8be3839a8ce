/*!
 * Obliterate - Secure in-place file destruction
 *
 * This library overwrites file content with patterned passes, flushes
 * every pass to the device, then renames and removes the directory
 * entries, reporting a terminal outcome per path.
 */

pub mod classify;
pub mod config;
pub mod error;
pub mod job;
pub mod overwrite;
pub mod platform;
pub mod report;
pub mod schedule;
pub mod types;
pub mod unlink;
pub mod utils;
pub mod walker;


// Re-export main components for easier access
pub use classify::{classify, Classified, ProfileCache};
pub use config::{Args, Config, FailurePolicy};
pub use error::{ObliterateError, Result};
pub use job::{JobSummary, ObliterationJob};
pub use report::{PathResult, ReportFormat, Reporter, RunReport};
pub use schedule::{build_plan, Fill, OverwritePlan, Pass};
pub use types::{
    Confidence, FailureKind, FileId, FileKind, FilesystemProfile, Outcome, PatternKind, SkipReason,
    Target,
};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
