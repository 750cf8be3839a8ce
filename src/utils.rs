/*!
 * Utility functions for obliterate
 */

use indicatif::ProgressStyle;
use once_cell::sync::Lazy;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

/// Progress bar style shared by the destruction phases
pub static PROGRESS_STYLE: Lazy<ProgressStyle> = Lazy::new(|| {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {prefix:.bold.cyan} {wide_msg:.dim.white} {bytes}/{total_bytes} ({percent}%) ⏱️  Elapsed: {elapsed_precise}  Remaining: {eta_precise}  Speed: {bytes_per_sec}")
        .unwrap()
});

/// Format a human-readable file size
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}

/// Random alphanumeric name of exactly `len` characters, drawn from the
/// same generator as the overwrite passes
pub fn random_name(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Shorten a file name for single-line progress messages
pub fn truncate_for_display(name: &str, max_len: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_len {
        return name.to_string();
    }
    let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
    format!("...{}", tail)
}
