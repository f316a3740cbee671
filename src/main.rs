//! Ethereum Vanity Wallet Generator CLI
//!
//! Usage:
//!   vanity-wallets -n 10                # 10 plain wallets
//!   vanity-wallets -p dead              # address starting with 0xdead
//!   vanity-wallets -p 00 -x f -n 3      # 3 addresses starting with 0x00 without any 'f'

use std::io;
use std::process;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::warn;

use vanity_wallets::report::{create_report_file, ReportWriter};
use vanity_wallets::worker::WorkerStats;
use vanity_wallets::{CancellationToken, Config, Progress, Search, SearchOutcome, SearchSummary};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let config = Config::parse();

    let spec = match config.to_search_spec() {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    let prefix = if spec.prefix().is_empty() { "(any)" } else { spec.prefix() };
    let excluded: String = spec.excluded().iter().collect();

    eprintln!("Ethereum Vanity Wallet Generator");
    eprintln!("================================");
    eprintln!("Prefix:     0x{}", prefix);
    eprintln!("Excluded:   {}", if excluded.is_empty() { "(none)" } else { excluded.as_str() });
    eprintln!(
        "Difficulty: {} (~{} keys per match)",
        spec.difficulty_description(),
        format_number(spec.expected_attempts() as u64)
    );
    eprintln!("Workers:    {}", spec.worker_count());
    eprintln!("Delivery:   {}", spec.delivery());
    eprintln!("Target:     {} wallet(s)", spec.required_count());

    let report_file = if config.no_file {
        None
    } else {
        let plain = spec.accepts_everything();
        match create_report_file(&config.output_dir, plain, config.report_format()) {
            Ok((path, file)) => {
                eprintln!("Report:     {}", path.display());
                Some(file)
            }
            Err(e) => {
                eprintln!("Error creating report file in {}: {}", config.output_dir.display(), e);
                process::exit(1);
            }
        }
    };
    eprintln!();

    let mut writer = ReportWriter::new(
        io::stdout(),
        report_file,
        config.report_format(),
        spec.required_count(),
    );

    let search = Search::new(spec);
    ctrlc_handler(search.cancellation());

    let reporter = config
        .report_interval()
        .map(|interval| spawn_reporter(search.cancellation(), search.stats(), interval));

    eprintln!("Searching... (Press Ctrl+C to stop)\n");

    let summary = match search.run(&mut writer, &mut |p: Progress| {
        eprintln!("Found {}/{}", p.found, p.required);
    }) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Search failed: {}", e);
            process::exit(1);
        }
    };

    if let Some(reporter) = reporter {
        let _ = reporter.join();
    }

    let report_ok = match writer.finish() {
        Ok(_) => true,
        Err(e) => {
            eprintln!("Error writing wallets: {}", e);
            false
        }
    };

    print_summary(&summary);

    let code = match summary.outcome {
        _ if !report_ok => 1,
        SearchOutcome::Completed | SearchOutcome::Interrupted => 0,
        SearchOutcome::Exhausted => 2,
    };
    process::exit(code);
}

/// Prints a progress line every `interval` until the run is cancelled.
///
/// The pool cancels on join, so this ends with every run.
fn spawn_reporter(
    cancel: CancellationToken,
    stats: Arc<WorkerStats>,
    interval: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let start = Instant::now();
        while !cancel.wait_timeout(interval) {
            let keys = stats.total_keys();
            let elapsed = start.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 { keys as f64 / elapsed } else { 0.0 };
            eprintln!(
                "[{:>4}s] Generated {} keys ({}/s)",
                start.elapsed().as_secs(),
                format_number(keys),
                format_number(rate as u64)
            );
        }
    })
}

fn print_summary(summary: &SearchSummary) {
    eprintln!();
    match summary.outcome {
        SearchOutcome::Completed => {
            eprintln!("Target reached! Found {} wallet(s).", summary.delivered)
        }
        SearchOutcome::Interrupted => eprintln!(
            "Stopped by user after {} of {} wallet(s).",
            summary.delivered, summary.required
        ),
        SearchOutcome::Exhausted => eprintln!(
            "All workers gave up after {} of {} wallet(s).",
            summary.delivered, summary.required
        ),
    }

    eprintln!("\n--- Final Statistics ---");
    eprintln!("Total keys generated: {}", format_number(summary.keys_tested));
    eprintln!("Total matches found:  {}", summary.matches_found);
    if summary.dropped > 0 {
        eprintln!("Matches dropped:      {}", summary.dropped);
    }
    if summary.surplus > 0 {
        eprintln!("Surplus discarded:    {}", summary.surplus);
    }
    eprintln!("Time elapsed:         {:.2}s", summary.elapsed.as_secs_f64());
    eprintln!(
        "Average speed:        {}/s",
        format_number(summary.keys_per_second() as u64)
    );
}

fn format_number(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.2}B", n as f64 / 1_000_000_000.0)
    } else if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

fn ctrlc_handler(cancel: CancellationToken) {
    if let Err(e) = ctrlc::set_handler(move || {
        cancel.cancel();
    }) {
        warn!(error = %e, "could not install Ctrl-C handler");
    }
}
