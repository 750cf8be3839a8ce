/*!
 * Configuration handling for obliterate
 */

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use clap_complete::Shell;

use crate::ensure;
use crate::error::Result;
use crate::types::PatternKind;

/// Policy for continuing after a target fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailurePolicy {
    /// Keep destroying the remaining targets and aggregate all outcomes (default)
    BestEffort,
    /// Stop scheduling new targets after the first failure
    AbortOnFirstFailure,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::BestEffort
    }
}

/// Command-line arguments for obliterate
#[derive(Parser, Debug, Clone)]
#[clap(
    name = "obliterate",
    version = env!("CARGO_PKG_VERSION"),
    about = "Securely destroy files by overwriting them in place before unlinking",
    long_about = "Overwrites file content in place with multiple patterned passes, flushing each pass to the device before the next begins, then renames and removes the directory entries. Recovery of content and file names becomes impractical on conventional filesystems."
)]
pub struct Args {
    /// Files and directories to destroy
    #[clap(required_unless_present = "generate")]
    pub paths: Vec<String>,

    /// Number of overwrite passes per target
    #[clap(long, short = 'n', default_value = "3")]
    pub passes: usize,

    /// Comma-separated pattern sequence, cycled across passes
    #[clap(
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = vec![PatternKind::Zeros, PatternKind::Ones, PatternKind::Random]
    )]
    pub patterns: Vec<PatternKind>,

    /// Follow symbolic links and destroy their targets
    #[clap(long)]
    pub follow_symlinks: bool,

    /// Rename entries to a random name before removal
    #[clap(long, action = ArgAction::Set, default_value_t = true)]
    pub rename_before_unlink: bool,

    /// What to do with the remaining targets after a failure
    #[clap(long, value_enum, default_value_t = FailurePolicy::default())]
    pub failure_policy: FailurePolicy,

    /// Remove directories left empty after destruction
    #[clap(long)]
    pub remove_empty_dirs: bool,

    /// Stay on the filesystem of each starting directory
    #[clap(long)]
    pub one_file_system: bool,

    /// Comma-separated list of name patterns to leave untouched
    #[clap(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Number of worker threads
    #[clap(long, default_value = "4")]
    pub threads: usize,

    /// Classify and plan without writing or removing anything
    #[clap(long)]
    pub dry_run: bool,

    /// Emit the report as JSON instead of tables
    #[clap(long)]
    pub json: bool,

    /// Verbose logging
    #[clap(long, short = 'v')]
    pub verbose: bool,

    /// Generate shell completions
    #[clap(long = "generate", value_enum)]
    pub generate: Option<Shell>,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Paths to destroy, in request order
    pub paths: Vec<PathBuf>,

    /// Number of overwrite passes per target
    pub passes: usize,

    /// Pattern sequence, cycled across passes
    pub patterns: Vec<PatternKind>,

    /// Whether symlinks are resolved instead of skipped
    pub follow_symlinks: bool,

    /// Whether entries are renamed before removal
    pub rename_before_unlink: bool,

    /// What to do with the remaining targets after a failure
    pub failure_policy: FailurePolicy,

    /// Whether directories left empty are removed afterwards
    pub remove_empty_dirs: bool,

    /// Whether expansion stays on the starting filesystem
    pub one_file_system: bool,

    /// Name patterns excluded from expansion
    pub exclude_patterns: Vec<String>,

    /// Number of worker threads
    pub num_threads: usize,

    /// Report without destroying
    pub dry_run: bool,

    /// Emit the report as JSON
    pub json: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            passes: 3,
            patterns: vec![PatternKind::Zeros, PatternKind::Ones, PatternKind::Random],
            follow_symlinks: false,
            rename_before_unlink: true,
            failure_policy: FailurePolicy::default(),
            remove_empty_dirs: false,
            one_file_system: false,
            exclude_patterns: Vec::new(),
            num_threads: 4,
            dry_run: false,
            json: false,
            verbose: false,
        }
    }
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args(args: Args) -> Self {
        Self {
            paths: args.paths.iter().map(PathBuf::from).collect(),
            passes: args.passes,
            patterns: args.patterns,
            follow_symlinks: args.follow_symlinks,
            rename_before_unlink: args.rename_before_unlink,
            failure_policy: args.failure_policy,
            remove_empty_dirs: args.remove_empty_dirs,
            one_file_system: args.one_file_system,
            exclude_patterns: args.exclude,
            num_threads: args.threads,
            dry_run: args.dry_run,
            json: args.json,
            verbose: args.verbose,
        }
    }

    /// Validate the configuration.
    ///
    /// Missing or unreadable paths are not validated here: they become
    /// per-path outcomes so one bad path cannot abort a batch.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.paths.is_empty(), Config, "no paths to destroy");
        ensure!(
            self.passes >= 1,
            Config,
            "at least one overwrite pass is required"
        );
        ensure!(!self.patterns.is_empty(), Config, "pattern sequence is empty");
        ensure!(
            self.num_threads >= 1,
            Config,
            "thread count must be at least 1"
        );
        Ok(())
    }
}
