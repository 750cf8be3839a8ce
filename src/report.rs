/*!
 * Reporting functionality for obliterate
 *
 * Provides functionality for generating formatted run reports using the
 * tabled library for clean, consistent table rendering, plus a JSON
 * format for machine consumption.
 */

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Padding, Style},
    Table, Tabled,
};

use crate::types::{Confidence, Outcome, SkipReason};
use crate::utils::{format_file_size, truncate_for_display};

/// Terminal result for one requested or discovered path
#[derive(Debug, Clone, Serialize)]
pub struct PathResult {
    /// Path the outcome belongs to
    pub path: PathBuf,
    /// Its terminal outcome
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Aggregate results of one destruction run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Wall-clock duration of the run
    pub duration: Duration,
    /// Per-path outcomes, in completion order
    pub results: Vec<PathResult>,
    /// Bytes actually written across all passes
    pub bytes_written: u64,
    /// Whether the run was cancelled before draining completely
    pub cancelled: bool,
}

impl RunReport {
    /// Number of fully destroyed targets
    pub fn destroyed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome.is_destroyed())
            .count()
    }

    /// Destroyed targets whose confidence the filesystem degraded
    pub fn degraded_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    Outcome::Destroyed {
                        confidence: Confidence::Degraded
                    }
                )
            })
            .count()
    }

    /// Number of partially overwritten targets
    pub fn partial_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::PartiallyOverwritten { .. }))
            .count()
    }

    /// Number of skipped paths
    pub fn skipped_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Skipped { .. }))
            .count()
    }

    /// Number of failed paths
    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Failed { .. }))
            .count()
    }

    /// Targets cancellation kept from starting
    fn cancelled_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    Outcome::Skipped {
                        reason: SkipReason::Cancelled
                    }
                )
            })
            .count()
    }

    /// Process exit code for this run.
    ///
    /// 0 when nothing was left undone, 2 when nothing at all could be
    /// destroyed, 1 for the mixed case. Benign skips never taint the code;
    /// cancelled targets count as undone.
    pub fn exit_code(&self) -> i32 {
        let undone = self.partial_count() + self.failed_count() + self.cancelled_count();
        if undone == 0 {
            0
        } else if self.destroyed_count() == 0 {
            2
        } else {
            1
        }
    }
}

/// Format of the report output
pub enum ReportFormat {
    /// Console table output
    ConsoleTable,
    /// Machine-readable JSON on stdout
    Json,
}

/// Report generator for run results
pub struct Reporter {
    format: ReportFormat,
}

impl Reporter {
    /// Create a new reporter
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    /// Format a number with human-readable units
    fn format_number(&self, num: usize) -> String {
        if num >= 1_000_000 {
            format!("{:.1}M", num as f64 / 1_000_000.0)
        } else if num >= 1_000 {
            format!("{:.1}K", num as f64 / 1_000.0)
        } else {
            num.to_string()
        }
    }

    /// Generate a report string based on run results
    pub fn generate_report(&self, report: &RunReport) -> String {
        match self.format {
            ReportFormat::ConsoleTable => self.generate_console_report(report),
            ReportFormat::Json => self.generate_json_report(report),
        }
    }

    /// Print the report to stdout
    pub fn print_report(&self, report: &RunReport) {
        println!("\n{}", self.generate_report(report));
    }

    // Format path for table display, truncating long ones from the left
    fn format_path(&self, path: &str, max_len: usize) -> String {
        if path.len() <= max_len {
            return path.to_string();
        }

        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() <= 2 {
            return truncate_for_display(path, max_len);
        }

        // Keep the last few segments
        let mut current_len = 3; // Start with "..."
        let mut segments = Vec::new();
        for part in parts.iter().rev() {
            let part_len = part.len() + 1; // +1 for '/'
            if current_len + part_len <= max_len {
                segments.push(*part);
                current_len += part_len;
            } else {
                break;
            }
        }

        let mut result = String::from("...");
        for part in segments.iter().rev() {
            result.push('/');
            result.push_str(part);
        }
        result
    }

    // Create a summary table using the tabled crate
    fn create_summary_table(&self, report: &RunReport) -> String {
        #[derive(Tabled)]
        struct SummaryRow {
            #[tabled(rename = "Metric")]
            key: String,

            #[tabled(rename = "Value")]
            value: String,
        }

        let mut rows = Vec::new();

        rows.push(SummaryRow {
            key: "🗑️ Destroyed".to_string(),
            value: self.format_number(report.destroyed_count()),
        });

        let degraded = report.degraded_count();
        if degraded > 0 {
            rows.push(SummaryRow {
                key: "❓ Degraded Confidence".to_string(),
                value: self.format_number(degraded),
            });
        }

        rows.push(SummaryRow {
            key: "⚠️ Partially Overwritten".to_string(),
            value: self.format_number(report.partial_count()),
        });

        rows.push(SummaryRow {
            key: "⏭️ Skipped".to_string(),
            value: self.format_number(report.skipped_count()),
        });

        rows.push(SummaryRow {
            key: "❌ Failed".to_string(),
            value: self.format_number(report.failed_count()),
        });

        rows.push(SummaryRow {
            key: "📦 Bytes Written".to_string(),
            value: format_file_size(report.bytes_written),
        });

        rows.push(SummaryRow {
            key: "⏱️ Process Time".to_string(),
            value: format!("{:.4?}", report.duration),
        });

        if report.cancelled {
            rows.push(SummaryRow {
                key: "🛑 Cancelled".to_string(),
                value: "yes".to_string(),
            });
        }

        let mut table = Table::new(rows);
        table
            .with(Style::rounded())
            .with(Padding::new(1, 1, 0, 0))
            .with(Modify::new(Columns::new(..)).with(Alignment::left()));

        table.to_string()
    }

    // Create a per-path results table using the tabled crate
    fn create_results_table(&self, results: &[&PathResult]) -> String {
        #[derive(Tabled)]
        struct ResultRow {
            #[tabled(rename = "Path")]
            path: String,

            #[tabled(rename = "Outcome")]
            outcome: String,

            #[tabled(rename = "Detail")]
            detail: String,
        }

        let rows: Vec<ResultRow> = results
            .iter()
            .map(|result| ResultRow {
                path: self.format_path(&result.path.to_string_lossy(), 60),
                outcome: result.outcome.label().to_string(),
                detail: result.outcome.detail(),
            })
            .collect();

        let mut table = Table::new(rows);
        table
            .with(Style::rounded())
            .with(Padding::new(1, 1, 0, 0))
            .with(Modify::new(Columns::new(..)).with(Alignment::left()));

        table.to_string()
    }

    // Generate a console table report
    fn generate_console_report(&self, report: &RunReport) -> String {
        // Small runs list every path; large runs list only the paths that
        // did not reach Destroyed, the JSON format carries the full list
        let (title, listed): (&str, Vec<&PathResult>) = if report.results.len() <= 15 {
            ("📋  PER-PATH RESULTS", report.results.iter().collect())
        } else {
            (
                "⚠️  PATHS NOT DESTROYED",
                report
                    .results
                    .iter()
                    .filter(|r| {
                        !r.outcome.is_destroyed()
                            && !matches!(r.outcome, Outcome::Skipped { .. })
                    })
                    .collect(),
            )
        };

        let summary_title = if report.cancelled {
            "🛑  OBLITERATION INTERRUPTED"
        } else {
            "✅  OBLITERATION COMPLETE"
        };
        let summary_table = self.create_summary_table(report);

        if listed.is_empty() {
            return format!("{}\n{}", summary_title, summary_table);
        }

        let results_table = self.create_results_table(&listed);
        format!(
            "{}\n{}\n\n{}\n{}",
            title, results_table, summary_title, summary_table
        )
    }

    // Generate a machine-readable JSON report
    fn generate_json_report(&self, report: &RunReport) -> String {
        #[derive(Serialize)]
        struct JsonReport<'a> {
            host: String,
            finished_at: String,
            duration_secs: f64,
            destroyed: usize,
            degraded: usize,
            partially_overwritten: usize,
            skipped: usize,
            failed: usize,
            bytes_written: u64,
            cancelled: bool,
            results: &'a [PathResult],
        }

        let json = JsonReport {
            host: hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string()),
            finished_at: chrono::Local::now().to_rfc3339(),
            duration_secs: report.duration.as_secs_f64(),
            destroyed: report.destroyed_count(),
            degraded: report.degraded_count(),
            partially_overwritten: report.partial_count(),
            skipped: report.skipped_count(),
            failed: report.failed_count(),
            bytes_written: report.bytes_written,
            cancelled: report.cancelled,
            results: &report.results,
        };

        serde_json::to_string_pretty(&json)
            .unwrap_or_else(|e| format!("{{\"error\": \"report serialization failed: {}\"}}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Confidence, FailureKind};

    fn result(path: &str, outcome: Outcome) -> PathResult {
        PathResult {
            path: PathBuf::from(path),
            outcome,
        }
    }

    fn report_with(results: Vec<PathResult>) -> RunReport {
        RunReport {
            duration: Duration::from_millis(10),
            results,
            bytes_written: 0,
            cancelled: false,
        }
    }

    #[test]
    fn all_destroyed_exits_zero() {
        let report = report_with(vec![
            result(
                "/a",
                Outcome::Destroyed {
                    confidence: Confidence::Full,
                },
            ),
            result(
                "/b",
                Outcome::Skipped {
                    reason: SkipReason::Directory,
                },
            ),
        ]);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn mixed_results_exit_one() {
        let report = report_with(vec![
            result(
                "/a",
                Outcome::Destroyed {
                    confidence: Confidence::Full,
                },
            ),
            result(
                "/b",
                Outcome::Failed {
                    kind: FailureKind::Io,
                    detail: "disk on fire".to_string(),
                },
            ),
        ]);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn nothing_destroyed_exits_two() {
        let report = report_with(vec![result(
            "/a",
            Outcome::Failed {
                kind: FailureKind::Input,
                detail: "missing".to_string(),
            },
        )]);
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn cancelled_targets_count_as_undone() {
        let report = report_with(vec![
            result(
                "/a",
                Outcome::Destroyed {
                    confidence: Confidence::Full,
                },
            ),
            result(
                "/b",
                Outcome::Skipped {
                    reason: SkipReason::Cancelled,
                },
            ),
        ]);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn json_report_carries_every_result() {
        let reporter = Reporter::new(ReportFormat::Json);
        let report = report_with(vec![result(
            "/a",
            Outcome::Destroyed {
                confidence: Confidence::Degraded,
            },
        )]);
        let json = reporter.generate_report(&report);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["destroyed"], 1);
        assert_eq!(value["degraded"], 1);
        assert_eq!(value["results"][0]["outcome"], "destroyed");
        assert_eq!(value["results"][0]["confidence"], "Degraded");
    }

    #[test]
    fn degraded_destructions_are_counted_but_benign() {
        let report = report_with(vec![
            result(
                "/a",
                Outcome::Destroyed {
                    confidence: Confidence::Full,
                },
            ),
            result(
                "/b",
                Outcome::Destroyed {
                    confidence: Confidence::Degraded,
                },
            ),
        ]);
        assert_eq!(report.degraded_count(), 1);
        assert_eq!(report.exit_code(), 0);
    }
}
