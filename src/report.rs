//! Console and file output of found wallets.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tracing::error;

use crate::collector::ResultSink;
use crate::wallet::Wallet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Human-readable block per wallet
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl ReportFormat {
    fn extension(self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "jsonl",
        }
    }
}

/// Renders the `index`-th (1-based) wallet of `required`.
pub fn render(wallet: &Wallet, index: usize, required: usize, format: ReportFormat) -> String {
    match format {
        ReportFormat::Text => format!(
            "Address:     {}\nPrivate key: {}\nCreated at:  {}\nProgress:    {}/{}\n\n",
            wallet.address,
            wallet.private_key,
            wallet.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            index,
            required
        ),
        ReportFormat::Json => match serde_json::to_string(wallet) {
            Ok(line) => line + "\n",
            Err(e) => format!("{{\"error\":\"{}\"}}\n", e),
        },
    }
}

/// Creates `<dir>/<stem>_<timestamp>.<ext>`, creating `dir` if needed.
///
/// `stem` is `vanity_wallets` for constrained searches and `wallets` when
/// every address qualifies.
pub fn create_report_file(
    dir: &Path,
    plain: bool,
    format: ReportFormat,
) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(dir)?;
    let stem = if plain { "wallets" } else { "vanity_wallets" };
    let name = format!(
        "{}_{}.{}",
        stem,
        Utc::now().format("%Y%m%d_%H%M%S"),
        format.extension()
    );
    let path = dir.join(name);
    let file = File::create(&path)?;
    Ok((path, file))
}

/// Writes every accepted wallet to the console and optionally to a report
/// file. Write errors do not stop collection; the first one is returned by
/// [`finish`](Self::finish).
pub struct ReportWriter<C: Write> {
    console: C,
    file: Option<BufWriter<File>>,
    format: ReportFormat,
    required: usize,
    written: usize,
    failure: Option<io::Error>,
}

impl<C: Write> ReportWriter<C> {
    pub fn new(console: C, file: Option<File>, format: ReportFormat, required: usize) -> Self {
        Self {
            console,
            file: file.map(BufWriter::new),
            format,
            required,
            written: 0,
            failure: None,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    fn record(&mut self, result: io::Result<()>) {
        if let Err(e) = result {
            error!(error = %e, "failed to write wallet report");
            self.failure.get_or_insert(e);
        }
    }

    /// Flushes everything and hands back the console.
    pub fn finish(mut self) -> io::Result<C> {
        let console = self.console.flush();
        self.record(console);
        if let Some(mut file) = self.file.take() {
            let flushed = file.flush();
            self.record(flushed);
        }
        match self.failure {
            Some(e) => Err(e),
            None => Ok(self.console),
        }
    }
}

impl<C: Write> ResultSink for ReportWriter<C> {
    fn accept(&mut self, wallet: Wallet) {
        self.written += 1;
        let text = render(&wallet, self.written, self.required, self.format);

        let console = self.console.write_all(text.as_bytes());
        self.record(console);
        if let Some(file) = self.file.as_mut() {
            let stored = file.write_all(text.as_bytes());
            self.record(stored);
        }
    }
}
