//! Single consumer of the result channel.
//!
//! The collector is the only place that decides how many wallets leave a
//! run: it forwards matches in arrival order, stops at the quota and then
//! cancels the workers.

use crossbeam_channel::Receiver;
use tracing::info;

use crate::wallet::Wallet;
use crate::worker::CancellationToken;

/// One unit of progress, emitted before the matching wallet is handed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Wallets consumed so far, including this one
    pub found: usize,
    /// Quota for the run
    pub required: usize,
}

/// Receives progress events.
pub trait ProgressSink {
    fn advance(&mut self, progress: Progress);
}

impl<F: FnMut(Progress)> ProgressSink for F {
    fn advance(&mut self, progress: Progress) {
        self(progress)
    }
}

/// Receives the wallets of a run, in arrival order.
pub trait ResultSink {
    fn accept(&mut self, wallet: Wallet);
}

impl ResultSink for Vec<Wallet> {
    fn accept(&mut self, wallet: Wallet) {
        self.push(wallet);
    }
}

/// What happened while draining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorReport {
    /// Wallets handed to the result sink
    pub delivered: usize,
    /// Whether `delivered` reached the quota
    pub quota_met: bool,
    /// The token was cancelled by someone else before the quota was met
    pub cancelled_externally: bool,
}

/// Bounds a run's output to exactly `required` wallets.
#[derive(Debug, Clone, Copy)]
pub struct Collector {
    required: usize,
}

impl Collector {
    pub fn new(required: usize) -> Self {
        Self { required }
    }

    /// Reads from `results` until the quota is met or every sender is gone.
    ///
    /// Meeting the quota cancels `cancel`; nothing is read afterwards.
    pub fn drain<R, P>(
        &self,
        results: &Receiver<Wallet>,
        cancel: &CancellationToken,
        sink: &mut R,
        progress: &mut P,
    ) -> CollectorReport
    where
        R: ResultSink + ?Sized,
        P: ProgressSink + ?Sized,
    {
        let mut delivered = 0;

        while delivered < self.required {
            let Ok(wallet) = results.recv() else {
                break;
            };
            delivered += 1;
            progress.advance(Progress {
                found: delivered,
                required: self.required,
            });
            sink.accept(wallet);
        }

        let quota_met = delivered == self.required;
        let cancelled_externally = if quota_met {
            cancel.cancel();
            info!(delivered, "quota reached, stopping workers");
            false
        } else {
            cancel.is_cancelled()
        };

        CollectorReport {
            delivered,
            quota_met,
            cancelled_externally,
        }
    }
}
