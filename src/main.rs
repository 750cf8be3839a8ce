/*!
 * Command-line interface for obliterate
 */

use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser};
use indicatif::ProgressBar;
use rayon::ThreadPoolBuilder;
use tracing_subscriber::EnvFilter;

use obliterate::config::{Args, Config};
use obliterate::job::ObliterationJob;
use obliterate::report::{ReportFormat, Reporter, RunReport};
use obliterate::utils::PROGRESS_STYLE;

/// Exit code for configuration and usage errors
const EXIT_USAGE: i32 = 64;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // Shell completion generation short-circuits the run
    if let Some(shell) = args.generate {
        let mut command = Args::command();
        let name = command.get_name().to_string();
        clap_complete::generate(shell, &mut command, name, &mut io::stdout());
        return;
    }

    // Create configuration
    let config = Config::from_args(args);

    setup_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(EXIT_USAGE);
    }

    // Configure thread pool
    if let Err(e) = ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build_global()
    {
        eprintln!("Warning: Failed to set thread pool size: {}", e);
    }

    // Create progress bar with advanced Unicode styling
    let progress = ProgressBar::new(0);
    progress.set_style(PROGRESS_STYLE.clone());
    progress.enable_steady_tick(Duration::from_millis(100));
    progress.set_prefix(if config.dry_run {
        "🔍 Planning"
    } else {
        "🔥 Destroying"
    });

    let emit_json = config.json;

    // Create the job and hook the interrupt handler to its cancel flag
    let job = ObliterationJob::new(config, Arc::new(progress.clone()));
    let cancel = job.cancel_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, draining in-flight targets...");
        cancel.store(true, Ordering::SeqCst);
    }) {
        eprintln!("Warning: Failed to install interrupt handler: {}", e);
    }

    // Start timing the run
    let start_time = Instant::now();

    let summary = match job.run() {
        Ok(summary) => summary,
        Err(e) => {
            progress.finish_and_clear();
            eprintln!("Error: {}", e);
            std::process::exit(EXIT_USAGE);
        }
    };

    let total_duration = start_time.elapsed();

    // Clear the progress bar
    progress.finish_and_clear();

    // Prepare the run report
    let run_report = RunReport {
        duration: total_duration,
        results: summary.results,
        bytes_written: summary.bytes_written,
        cancelled: summary.cancelled,
    };

    // Create a reporter and print the report
    let format = if emit_json {
        ReportFormat::Json
    } else {
        ReportFormat::ConsoleTable
    };
    let reporter = Reporter::new(format);
    reporter.print_report(&run_report);

    std::process::exit(run_report.exit_code());
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("obliterate=debug,warn")
    } else {
        EnvFilter::new("obliterate=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
