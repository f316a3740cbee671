//! CPU worker: generate, test, deliver, repeat.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{select, Sender, TrySendError};
use tracing::{debug, error, warn};

use crate::crypto::{Candidate, CandidateSource, EntropyError, MAX_ENTROPY_ATTEMPTS};
use crate::matcher::SearchSpec;
use crate::wallet::Wallet;

use super::CancellationToken;

/// How a worker hands a match to the collector. Fixed for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryPolicy {
    /// Wait until the collector takes the match or the run is cancelled.
    /// No match is ever lost.
    #[default]
    Blocking,
    /// Offer the match once; if the result channel is full it is discarded.
    /// Never waits.
    BestEffort,
}

impl fmt::Display for DeliveryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryPolicy::Blocking => write!(f, "blocking"),
            DeliveryPolicy::BestEffort => write!(f, "best-effort"),
        }
    }
}

/// Why a worker loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The run was cancelled
    Cancelled,
    /// No delivery within the per-worker timeout
    TimedOut,
    /// Candidate generation kept failing
    EntropyFailure,
    /// The result channel has no receiver any more
    StreamClosed,
    /// The worker thread panicked
    Panicked,
}

/// Counters shared by every worker of a pool.
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Candidates generated and tested
    pub keys_generated: AtomicU64,
    /// Candidates that satisfied the search
    pub matches_found: AtomicU64,
    /// Wallets accepted into the result channel
    pub accepted: AtomicU64,
    /// Matches discarded by best-effort delivery while the quota still
    /// depended on them
    pub dropped: AtomicU64,
    /// Matches discarded after enough wallets were already queued
    pub surplus: AtomicU64,
}

impl WorkerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_keys(&self) -> u64 {
        self.keys_generated.load(Ordering::Relaxed)
    }

    pub fn total_matches(&self) -> u64 {
        self.matches_found.load(Ordering::Relaxed)
    }

    pub fn total_accepted(&self) -> u64 {
        self.accepted.load(Ordering::Acquire)
    }

    pub fn total_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn total_surplus(&self) -> u64 {
        self.surplus.load(Ordering::Relaxed)
    }

    /// Counts a discarded match. Once `required` wallets sit in the channel
    /// or have been read from it the quota is secured, and later discards
    /// cost the run nothing.
    fn record_discard(&self, required: u64) {
        let counter = if self.total_accepted() >= required {
            &self.surplus
        } else {
            &self.dropped
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

enum Delivery {
    Accepted,
    Dropped,
    Cancelled,
    Closed,
}

/// A single search loop, run on its own thread by the pool.
pub struct CpuWorker {
    id: usize,
    spec: Arc<SearchSpec>,
    source: Arc<dyn CandidateSource>,
    result_tx: Sender<Wallet>,
    cancel: CancellationToken,
    stats: Arc<WorkerStats>,
}

impl CpuWorker {
    pub fn new(
        id: usize,
        spec: Arc<SearchSpec>,
        source: Arc<dyn CandidateSource>,
        result_tx: Sender<Wallet>,
        cancel: CancellationToken,
        stats: Arc<WorkerStats>,
    ) -> Self {
        Self {
            id,
            spec,
            source,
            result_tx,
            cancel,
            stats,
        }
    }

    /// Runs until cancellation, timeout, persistent entropy failure or the
    /// result channel closing.
    pub fn run(self) -> WorkerExit {
        debug!(worker = self.id, "worker started");
        let exit = self.search();
        debug!(worker = self.id, ?exit, "worker stopped");
        exit
    }

    fn search(&self) -> WorkerExit {
        // Flush the key counter in batches to keep atomics off the hot path
        const STATS_BATCH: u64 = 1024;

        let timeout = self.spec.worker_timeout();
        let mut last_delivery = Instant::now();
        let mut address = String::with_capacity(42);
        let mut pending = 0u64;

        let exit = loop {
            let candidate = match self.next_candidate() {
                Ok(candidate) => candidate,
                Err(e) => {
                    error!(
                        worker = self.id,
                        attempts = MAX_ENTROPY_ATTEMPTS,
                        error = %e,
                        "candidate generation keeps failing, worker giving up"
                    );
                    break WorkerExit::EntropyFailure;
                }
            };
            pending += 1;

            candidate.address().write_prefixed(&mut address);
            if self.spec.matches(&address) {
                self.stats.matches_found.fetch_add(1, Ordering::Relaxed);
                match self.deliver(candidate.into_wallet(self.id)) {
                    Delivery::Accepted => {
                        self.stats.accepted.fetch_add(1, Ordering::Release);
                        last_delivery = Instant::now();
                    }
                    Delivery::Dropped => {
                        self.stats.record_discard(self.spec.required_count() as u64);
                    }
                    Delivery::Cancelled => break WorkerExit::Cancelled,
                    Delivery::Closed => break WorkerExit::StreamClosed,
                }
            }

            if pending >= STATS_BATCH {
                self.stats.keys_generated.fetch_add(pending, Ordering::Relaxed);
                pending = 0;
            }

            if self.cancel.is_cancelled() {
                break WorkerExit::Cancelled;
            }

            if let Some(timeout) = timeout {
                if last_delivery.elapsed() >= timeout {
                    warn!(
                        worker = self.id,
                        timeout_ms = timeout.as_millis() as u64,
                        "no delivery within timeout, worker exiting"
                    );
                    break WorkerExit::TimedOut;
                }
            }
        };

        self.stats.keys_generated.fetch_add(pending, Ordering::Relaxed);
        exit
    }

    fn next_candidate(&self) -> Result<Candidate, EntropyError> {
        let mut attempt = 1;
        loop {
            match self.source.next_candidate() {
                Ok(candidate) => return Ok(candidate),
                Err(e) if attempt < MAX_ENTROPY_ATTEMPTS => {
                    warn!(
                        worker = self.id,
                        attempt,
                        error = %e,
                        "candidate generation failed, retrying"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn deliver(&self, wallet: Wallet) -> Delivery {
        match self.spec.delivery() {
            DeliveryPolicy::Blocking => select! {
                send(self.result_tx, wallet) -> res => match res {
                    Ok(()) => Delivery::Accepted,
                    Err(_) => Delivery::Closed,
                },
                recv(self.cancel.signal()) -> _ => Delivery::Cancelled,
            },
            DeliveryPolicy::BestEffort => match self.result_tx.try_send(wallet) {
                Ok(()) => Delivery::Accepted,
                Err(TrySendError::Full(_)) => Delivery::Dropped,
                Err(TrySendError::Disconnected(_)) => Delivery::Closed,
            },
        }
    }
}
