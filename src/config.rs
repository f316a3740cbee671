//! Command-line configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::matcher::{ConfigError, SearchSpec, DEFAULT_MAX_PREFIX_LEN};
use crate::report::ReportFormat;
use crate::worker::DeliveryPolicy;

/// Ethereum vanity wallet generator
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Hex prefix the address must start with after 0x (empty = any address)
    #[arg(short, long, default_value = "")]
    pub prefix: String,

    /// Characters that must not appear anywhere in the address, e.g. "f0"
    #[arg(short = 'x', long, default_value = "")]
    pub exclude: String,

    /// Number of wallets to generate
    #[arg(short = 'n', long, default_value = "1")]
    pub count: usize,

    /// Number of worker threads (default: number of CPU cores)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Give up on a worker after this many seconds without a match
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Discard matches when the collector is busy instead of waiting
    #[arg(long, default_value = "false")]
    pub best_effort: bool,

    /// Longest prefix accepted
    #[arg(long, default_value_t = DEFAULT_MAX_PREFIX_LEN)]
    pub max_prefix_len: usize,

    /// Directory the wallet report is written to
    #[arg(short = 'o', long, default_value = "wallets")]
    pub output_dir: PathBuf,

    /// Print wallets only, do not write a report file
    #[arg(long, default_value = "false")]
    pub no_file: bool,

    /// Emit one JSON object per wallet instead of text blocks
    #[arg(long, default_value = "false")]
    pub json: bool,

    /// Progress report interval in seconds (0 = off)
    #[arg(short = 'r', long, default_value = "5")]
    pub report_interval: u64,
}

impl Config {
    /// Returns the number of workers, defaulting to CPU count
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    pub fn delivery(&self) -> DeliveryPolicy {
        if self.best_effort {
            DeliveryPolicy::BestEffort
        } else {
            DeliveryPolicy::Blocking
        }
    }

    pub fn report_format(&self) -> ReportFormat {
        if self.json {
            ReportFormat::Json
        } else {
            ReportFormat::Text
        }
    }

    pub fn report_interval(&self) -> Option<Duration> {
        (self.report_interval > 0).then(|| Duration::from_secs(self.report_interval))
    }

    /// Builds and validates the search described by the flags.
    pub fn to_search_spec(&self) -> Result<SearchSpec, ConfigError> {
        SearchSpec::builder()
            .prefix(self.prefix.as_str())
            .exclude(self.exclude.chars().filter(|c| !c.is_whitespace() && *c != ','))
            .required_count(self.count)
            .worker_count(self.worker_count())
            .worker_timeout(self.timeout.map(Duration::from_secs))
            .delivery(self.delivery())
            .max_prefix_len(self.max_prefix_len)
            .build()
    }
}
