//! Blocking search entry point.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::collector::{Collector, ProgressSink, ResultSink};
use crate::crypto::{CandidateSource, KeyGenerator};
use crate::matcher::{ConfigError, SearchSpec};
use crate::worker::{CancellationToken, WorkerExit, WorkerPool, WorkerStats};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Exactly the required number of wallets was delivered
    Completed,
    /// Every worker exited (timeout or entropy failure) before the quota
    Exhausted,
    /// Cancelled from outside before the quota
    Interrupted,
}

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchOutcome::Completed => write!(f, "completed"),
            SearchOutcome::Exhausted => write!(f, "exhausted"),
            SearchOutcome::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Result of a finished run. The wallets themselves went to the result sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSummary {
    pub outcome: SearchOutcome,
    /// Wallets handed to the result sink
    pub delivered: usize,
    /// Wallets asked for
    pub required: usize,
    /// Candidates generated across all workers
    pub keys_tested: u64,
    /// Matching candidates, delivered or not
    pub matches_found: u64,
    /// Matches discarded by best-effort delivery that the quota went
    /// without. Always zero for a completed run.
    pub dropped: u64,
    /// Matches discarded once the quota no longer depended on them
    pub surplus: u64,
    pub elapsed: Duration,
    /// How each worker loop ended, indexed by worker ID
    pub worker_exits: Vec<WorkerExit>,
}

impl SearchSummary {
    pub fn is_complete(&self) -> bool {
        self.outcome == SearchOutcome::Completed
    }

    pub fn keys_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.keys_tested as f64 / secs
        } else {
            0.0
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("invalid search: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to start worker thread: {0}")]
    Spawn(#[from] io::Error),
}

/// A single prepared run.
///
/// Exposes its cancellation token and counters before it starts, so a
/// caller can wire up signal handlers and progress reporting first.
pub struct Search {
    spec: Arc<SearchSpec>,
    source: Arc<dyn CandidateSource>,
    cancel: CancellationToken,
    stats: Arc<WorkerStats>,
}

impl Search {
    /// A run drawing keys from the OS RNG.
    pub fn new(spec: SearchSpec) -> Self {
        Self::with_source(spec, Arc::new(KeyGenerator::new()))
    }

    pub fn with_source(spec: SearchSpec, source: Arc<dyn CandidateSource>) -> Self {
        Self {
            spec: Arc::new(spec),
            source,
            cancel: CancellationToken::new(),
            stats: Arc::new(WorkerStats::new()),
        }
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Live counters, updated by the workers while the run is going.
    pub fn stats(&self) -> Arc<WorkerStats> {
        self.stats.clone()
    }

    /// Runs the search to the end: starts the workers, collects on the
    /// calling thread, then joins every worker.
    pub fn run<R, P>(
        self,
        results: &mut R,
        progress: &mut P,
    ) -> Result<SearchSummary, SearchError>
    where
        R: ResultSink + ?Sized,
        P: ProgressSink + ?Sized,
    {
        let start = Instant::now();
        let required = self.spec.required_count();

        info!(
            prefix = %self.spec.prefix(),
            excluded = self.spec.excluded().len(),
            required,
            workers = self.spec.worker_count(),
            delivery = %self.spec.delivery(),
            "starting search"
        );

        let pool = WorkerPool::with_source(
            self.spec.clone(),
            self.source.clone(),
            self.cancel.clone(),
            self.stats.clone(),
        )?;

        let report = Collector::new(required).drain(
            pool.result_receiver(),
            &self.cancel,
            results,
            progress,
        );
        let worker_exits = pool.join();

        let outcome = if report.quota_met {
            SearchOutcome::Completed
        } else if report.cancelled_externally {
            SearchOutcome::Interrupted
        } else {
            SearchOutcome::Exhausted
        };

        // A completed run lost nothing it needed, whatever the workers
        // counted while the collector was catching up.
        let (dropped, surplus) = match outcome {
            SearchOutcome::Completed => (
                0,
                self.stats.total_dropped() + self.stats.total_surplus(),
            ),
            _ => (self.stats.total_dropped(), self.stats.total_surplus()),
        };

        let summary = SearchSummary {
            outcome,
            delivered: report.delivered,
            required,
            keys_tested: self.stats.total_keys(),
            matches_found: self.stats.total_matches(),
            dropped,
            surplus,
            elapsed: start.elapsed(),
            worker_exits,
        };

        match outcome {
            SearchOutcome::Completed => info!(
                delivered = summary.delivered,
                keys = summary.keys_tested,
                elapsed_ms = summary.elapsed.as_millis() as u64,
                "search completed"
            ),
            _ => warn!(
                %outcome,
                delivered = summary.delivered,
                required,
                keys = summary.keys_tested,
                dropped = summary.dropped,
                "search ended before quota"
            ),
        }

        Ok(summary)
    }
}

/// Runs `spec` with the OS key generator. Blocks until the quota is met or
/// every worker has given up.
pub fn run_search<R, P>(
    spec: &SearchSpec,
    results: &mut R,
    progress: &mut P,
) -> Result<SearchSummary, SearchError>
where
    R: ResultSink + ?Sized,
    P: ProgressSink + ?Sized,
{
    Search::new(spec.clone()).run(results, progress)
}

/// Same as [`run_search`] with an injected candidate source.
pub fn search_with_source<R, P>(
    spec: &SearchSpec,
    source: Arc<dyn CandidateSource>,
    results: &mut R,
    progress: &mut P,
) -> Result<SearchSummary, SearchError>
where
    R: ResultSink + ?Sized,
    P: ProgressSink + ?Sized,
{
    Search::with_source(spec.clone(), source).run(results, progress)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::thread;

    use super::*;
    use crate::collector::Progress;
    use crate::testing::{AlwaysMatching, Failing, NeverMatching, Scripted};
    use crate::wallet::Wallet;
    use crate::worker::{DeliveryPolicy, RESULT_BUFFER_CAP};

    fn spec(
        required: usize,
        workers: usize,
        delivery: DeliveryPolicy,
        timeout_ms: Option<u64>,
    ) -> SearchSpec {
        SearchSpec::builder()
            .prefix("ab")
            .required_count(required)
            .worker_count(workers)
            .delivery(delivery)
            .worker_timeout(timeout_ms.map(Duration::from_millis))
            .build()
            .unwrap()
    }

    fn collect(
        spec: &SearchSpec,
        source: Arc<dyn CandidateSource>,
    ) -> (Vec<Wallet>, Vec<Progress>, SearchSummary) {
        let mut wallets = Vec::new();
        let mut events = Vec::new();
        let mut progress = |p: Progress| events.push(p);
        let summary = search_with_source(spec, source, &mut wallets, &mut progress).unwrap();
        (wallets, events, summary)
    }

    #[test]
    fn test_quota_never_exceeded() {
        for delivery in [DeliveryPolicy::Blocking, DeliveryPolicy::BestEffort] {
            let spec = spec(5, 4, delivery, None);
            let (wallets, events, summary) =
                collect(&spec, Arc::new(AlwaysMatching::new("ab")));

            assert_eq!(wallets.len(), 5, "{}", delivery);
            assert_eq!(events.len(), 5);
            assert_eq!(summary.outcome, SearchOutcome::Completed);
            assert_eq!(summary.delivered, 5);
            assert!(summary.matches_found >= 5);
            assert_eq!(summary.worker_exits.len(), 4);
            assert!(!summary.worker_exits.contains(&WorkerExit::Panicked));
        }
    }

    #[test]
    fn test_wallets_are_distinct() {
        let spec = spec(50, 4, DeliveryPolicy::Blocking, None);
        let (wallets, _, _) = collect(&spec, Arc::new(AlwaysMatching::new("ab")));

        let keys: HashSet<_> = wallets.iter().map(|w| w.private_key.clone()).collect();
        assert_eq!(keys.len(), 50);
    }

    #[test]
    fn test_blocking_delivery_loses_nothing() {
        let spec = spec(20, 4, DeliveryPolicy::Blocking, Some(2_000));
        let source = Arc::new(Scripted::new("ab", 20));
        let (wallets, _, summary) = collect(&spec, source);

        assert_eq!(wallets.len(), 20);
        assert_eq!(summary.outcome, SearchOutcome::Completed);
        assert_eq!(summary.matches_found, 20);
        assert_eq!(summary.dropped, 0);
    }

    #[test]
    fn test_best_effort_completion_drops_nothing() {
        for _ in 0..20 {
            let spec = spec(5, 4, DeliveryPolicy::BestEffort, None);
            let (wallets, _, summary) = collect(&spec, Arc::new(AlwaysMatching::new("ab")));

            assert_eq!(wallets.len(), 5);
            assert_eq!(summary.outcome, SearchOutcome::Completed);
            assert_eq!(summary.dropped, 0);
            assert!(summary.matches_found >= 5 + summary.surplus);
        }
    }

    #[test]
    fn test_best_effort_drops_before_quota_exhaust_the_run() {
        let required = RESULT_BUFFER_CAP + 200;
        let spec = spec(required, 4, DeliveryPolicy::BestEffort, Some(1_000));
        let source = Arc::new(Scripted::new("ab", required));

        // Stall the collector after the first wallet so the workers burn
        // through every scripted match against a full channel.
        let mut wallets: Vec<Wallet> = Vec::new();
        let mut stall = |p: Progress| {
            if p.found == 1 {
                thread::sleep(Duration::from_millis(200));
            }
        };
        let summary = search_with_source(&spec, source, &mut wallets, &mut stall).unwrap();

        assert_eq!(summary.outcome, SearchOutcome::Exhausted);
        assert!(wallets.len() < required);
        assert_eq!(summary.delivered, wallets.len());
        assert!(summary.dropped > 0);
        assert_eq!(summary.surplus, 0);
        assert_eq!(summary.matches_found, required as u64);
        assert_eq!(wallets.len() as u64 + summary.dropped, summary.matches_found);
    }

    #[test]
    fn test_quota_met_iff_nothing_dropped() {
        for required in [20, RESULT_BUFFER_CAP + 50] {
            let spec = spec(required, 8, DeliveryPolicy::BestEffort, Some(500));
            let mut wallets: Vec<Wallet> = Vec::new();
            let mut stall = |p: Progress| {
                if p.found == 1 {
                    thread::sleep(Duration::from_millis(100));
                }
            };
            let summary = search_with_source(
                &spec,
                Arc::new(Scripted::new("ab", required)),
                &mut wallets,
                &mut stall,
            )
            .unwrap();

            assert!(wallets.len() <= required);
            assert_eq!(wallets.len() == required, summary.dropped == 0, "{}", required);
            assert_eq!(summary.is_complete(), summary.dropped == 0);
        }
    }

    #[test]
    fn test_all_workers_timing_out_is_exhaustion() {
        let spec = spec(3, 4, DeliveryPolicy::Blocking, Some(30));
        let (wallets, events, summary) =
            collect(&spec, Arc::new(NeverMatching::default()));

        assert!(wallets.is_empty());
        assert!(events.is_empty());
        assert_eq!(summary.outcome, SearchOutcome::Exhausted);
        assert_eq!(summary.delivered, 0);
        assert_eq!(summary.worker_exits, vec![WorkerExit::TimedOut; 4]);
    }

    #[test]
    fn test_entropy_failure_everywhere_is_exhaustion() {
        let spec = spec(1, 3, DeliveryPolicy::Blocking, None);
        let (wallets, _, summary) = collect(&spec, Arc::new(Failing::default()));

        assert!(wallets.is_empty());
        assert_eq!(summary.outcome, SearchOutcome::Exhausted);
        assert_eq!(summary.worker_exits, vec![WorkerExit::EntropyFailure; 3]);
    }

    #[test]
    fn test_partial_results_survive_exhaustion() {
        let spec = spec(10, 2, DeliveryPolicy::Blocking, Some(100));
        let (wallets, _, summary) = collect(&spec, Arc::new(Scripted::new("ab", 4)));

        assert_eq!(wallets.len(), 4);
        assert_eq!(summary.outcome, SearchOutcome::Exhausted);
        assert!(wallets.iter().all(|w| w.address_lowercase().starts_with("0xab")));
    }

    #[test]
    fn test_external_cancel_interrupts() {
        let spec = spec(1, 2, DeliveryPolicy::Blocking, None);
        let search = Search::with_source(spec, Arc::new(NeverMatching::default()));
        let token = search.cancellation();

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            token.cancel();
        });

        let mut wallets: Vec<Wallet> = Vec::new();
        let summary = search.run(&mut wallets, &mut |_: Progress| {}).unwrap();
        canceller.join().unwrap();

        assert!(wallets.is_empty());
        assert_eq!(summary.outcome, SearchOutcome::Interrupted);
        assert_eq!(summary.worker_exits, vec![WorkerExit::Cancelled; 2]);
    }

    #[test]
    fn test_end_to_end_with_real_keys() {
        let spec = SearchSpec::builder()
            .prefix("0")
            .required_count(1)
            .worker_count(4)
            .build()
            .unwrap();

        let mut wallets: Vec<Wallet> = Vec::new();
        let summary = run_search(&spec, &mut wallets, &mut |_: Progress| {}).unwrap();

        assert!(summary.is_complete());
        assert_eq!(wallets.len(), 1);
        let wallet = &wallets[0];
        assert!(wallet.address.starts_with("0x0"));
        assert_eq!(wallet.private_key.len(), 64);

        // the key really controls the address
        let secret: [u8; 32] = hex::decode(&wallet.private_key).unwrap().try_into().unwrap();
        let secp = secp256k1::Secp256k1::signing_only();
        let keypair = crate::crypto::Keypair::from_secret_key(&secp, secret).unwrap();
        assert_eq!(keypair.address().to_checksum(), wallet.address);
    }

    #[test]
    fn test_end_to_end_with_exclusions() {
        let spec = SearchSpec::builder()
            .prefix("a")
            .exclude(['0'])
            .required_count(2)
            .worker_count(4)
            .build()
            .unwrap();

        let mut wallets: Vec<Wallet> = Vec::new();
        let summary = run_search(&spec, &mut wallets, &mut |_: Progress| {}).unwrap();

        assert!(summary.is_complete());
        for wallet in &wallets {
            let lower = wallet.address_lowercase();
            assert!(lower.starts_with("0xa"));
            assert!(!lower[2..].contains('0'));
        }
    }
}
