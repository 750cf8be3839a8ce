/*!
 * Directory expansion: turn a directory input into the flat list of
 * entries the engine will classify and destroy
 */

use std::path::{Path, PathBuf};

use glob_match::glob_match;
use walkdir::WalkDir;

use crate::config::Config;

/// Everything one directory expansion produced
#[derive(Debug, Default)]
pub struct WalkOutput {
    /// Non-directory entries to classify, in discovery order
    pub candidates: Vec<PathBuf>,
    /// Directories seen during expansion, deepest first, root included
    pub directories: Vec<PathBuf>,
    /// Entries dropped by an exclude pattern
    pub excluded: Vec<PathBuf>,
    /// Entries that could not be read, with the cause
    pub failures: Vec<(PathBuf, String)>,
}

/// Walker over one directory input
pub struct Walker<'a> {
    config: &'a Config,
}

impl<'a> Walker<'a> {
    /// Create a new walker
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Expand a directory into candidates, subdirectories and failures.
    ///
    /// Traversal never aborts: unreadable entries are recorded and the walk
    /// continues. Symlinks are yielded as candidates unless symlink
    /// following is enabled, in which case walkdir resolves them and its
    /// loop detection reports cycles as per-entry errors.
    pub fn expand(&self, root: &Path) -> WalkOutput {
        let mut output = WalkOutput::default();

        let mut iter = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .same_file_system(self.config.one_file_system)
            .into_iter();

        while let Some(item) = iter.next() {
            let entry = match item {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    tracing::debug!(path = %path.display(), "traversal error: {}", err);
                    output.failures.push((path, err.to_string()));
                    continue;
                }
            };

            let path = entry.path();
            let is_dir = entry.file_type().is_dir();

            // Explicit inputs are never excluded, only discovered entries
            if path != root && self.is_excluded(path) {
                if is_dir {
                    iter.skip_current_dir();
                }
                output.excluded.push(path.to_path_buf());
                continue;
            }

            if is_dir {
                // A followed dir symlink is expanded but cannot be removed
                // with remove_dir, so it never joins the removal list
                if !entry.path_is_symlink() {
                    output.directories.push(path.to_path_buf());
                }
            } else {
                output.candidates.push(path.to_path_buf());
            }
        }

        // Pre-order yields parents first; reversed, children come first so
        // empty-directory removal can proceed bottom up
        output.directories.reverse();
        output
    }

    /// Check if a discovered entry matches an exclude pattern
    fn is_excluded(&self, path: &Path) -> bool {
        let file_name = path.file_name().unwrap_or_default().to_string_lossy();
        self.config
            .exclude_patterns
            .iter()
            .any(|pattern| glob_match(pattern, &file_name))
    }
}
