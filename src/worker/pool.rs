//! Worker pool management.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::crypto::{CandidateSource, KeyGenerator};
use crate::matcher::SearchSpec;
use crate::wallet::Wallet;

use super::cpu::{CpuWorker, WorkerExit, WorkerStats};
use super::CancellationToken;

/// Upper bound on wallets buffered between the workers and the collector.
pub const RESULT_BUFFER_CAP: usize = 1024;

/// A running set of search workers feeding one result channel.
pub struct WorkerPool {
    /// Worker thread handles (Option to allow taking during join)
    handles: Option<Vec<JoinHandle<WorkerExit>>>,
    /// Channel receiver for results
    result_rx: Receiver<Wallet>,
    /// Shared cancellation
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Starts `spec.worker_count()` workers drawing keys from the OS RNG.
    pub fn new(spec: SearchSpec, cancel: CancellationToken) -> io::Result<Self> {
        Self::with_source(
            Arc::new(spec),
            Arc::new(KeyGenerator::new()),
            cancel,
            Arc::new(WorkerStats::new()),
        )
    }

    /// Starts the workers with an explicit candidate source and shared
    /// counters.
    pub fn with_source(
        spec: Arc<SearchSpec>,
        source: Arc<dyn CandidateSource>,
        cancel: CancellationToken,
        stats: Arc<WorkerStats>,
    ) -> io::Result<Self> {
        let capacity = spec.required_count().min(RESULT_BUFFER_CAP);
        let (result_tx, result_rx) = bounded(capacity);

        // The pool keeps no sender, so the channel disconnects once every
        // worker has exited.
        let handles = Self::spawn_workers(&spec, &source, result_tx, &cancel, &stats)?;

        debug!(
            workers = handles.len(),
            capacity,
            delivery = %spec.delivery(),
            "worker pool started"
        );

        Ok(Self {
            handles: Some(handles),
            result_rx,
            cancel,
        })
    }

    /// Spawns worker threads. On failure the already started workers are
    /// cancelled and joined before the error is returned.
    fn spawn_workers(
        spec: &Arc<SearchSpec>,
        source: &Arc<dyn CandidateSource>,
        result_tx: Sender<Wallet>,
        cancel: &CancellationToken,
        stats: &Arc<WorkerStats>,
    ) -> io::Result<Vec<JoinHandle<WorkerExit>>> {
        let mut handles = Vec::with_capacity(spec.worker_count());

        for id in 0..spec.worker_count() {
            let worker = CpuWorker::new(
                id,
                spec.clone(),
                source.clone(),
                result_tx.clone(),
                cancel.clone(),
                stats.clone(),
            );

            let spawned = thread::Builder::new()
                .name(format!("vanity-worker-{}", id))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    warn!(worker = id, error = %e, "failed to spawn worker thread");
                    cancel.cancel();
                    drop(result_tx);
                    join_started(handles);
                    return Err(e);
                }
            }
        }

        Ok(handles)
    }

    /// The channel matches arrive on.
    pub fn result_receiver(&self) -> &Receiver<Wallet> {
        &self.result_rx
    }

    /// Cancels the workers and waits for every one of them, returning how
    /// each loop ended.
    pub fn join(mut self) -> Vec<WorkerExit> {
        self.cancel.cancel();
        self.join_workers()
    }

    fn join_workers(&mut self) -> Vec<WorkerExit> {
        self.handles
            .take()
            .map(|handles| {
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap_or(WorkerExit::Panicked))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Joins workers that were started before a spawn failure, logging any that
/// panicked. Returns how many did.
fn join_started(handles: Vec<JoinHandle<WorkerExit>>) -> usize {
    let mut panicked = 0;
    for (id, handle) in handles.into_iter().enumerate() {
        if handle.join().is_err() {
            warn!(worker = id, "worker panicked while the pool was starting");
            panicked += 1;
        }
    }
    panicked
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.join_workers();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{AlwaysMatching, NeverMatching};
    use crate::worker::DeliveryPolicy;

    fn pool_with(
        source: Arc<dyn CandidateSource>,
        workers: usize,
        timeout_ms: Option<u64>,
    ) -> (WorkerPool, CancellationToken, Arc<WorkerStats>) {
        let spec = SearchSpec::builder()
            .prefix("ab")
            .required_count(3)
            .worker_count(workers)
            .worker_timeout(timeout_ms.map(Duration::from_millis))
            .delivery(DeliveryPolicy::Blocking)
            .build()
            .unwrap();
        let cancel = CancellationToken::new();
        let stats = Arc::new(WorkerStats::new());
        let pool =
            WorkerPool::with_source(Arc::new(spec), source, cancel.clone(), stats.clone()).unwrap();
        (pool, cancel, stats)
    }

    #[test]
    fn test_pool_produces_results() {
        let (pool, _, _) = pool_with(Arc::new(AlwaysMatching::new("ab")), 2, None);

        let wallet = pool.result_receiver().recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(wallet.address_lowercase().starts_with("0xab"));

        let exits = pool.join();
        assert_eq!(exits, vec![WorkerExit::Cancelled; 2]);
    }

    #[test]
    fn test_channel_disconnects_when_all_workers_exit() {
        let (pool, cancel, stats) = pool_with(Arc::new(NeverMatching::default()), 3, Some(20));

        // every worker times out, dropping its sender
        assert!(pool.result_receiver().recv().is_err());
        assert!(!cancel.is_cancelled());
        assert!(stats.total_keys() > 0);
        assert_eq!(stats.total_matches(), 0);

        assert_eq!(pool.join(), vec![WorkerExit::TimedOut; 3]);
    }

    #[test]
    fn test_real_key_pool() {
        let spec = SearchSpec::builder()
            .required_count(2)
            .worker_count(2)
            .build()
            .unwrap();
        let pool = WorkerPool::new(spec, CancellationToken::new()).unwrap();

        let wallet = pool.result_receiver().recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(wallet.address.len(), 42);
        assert_eq!(pool.join().len(), 2);
    }

    #[test]
    fn test_drop_stops_workers() {
        let (pool, cancel, _) = pool_with(Arc::new(NeverMatching::default()), 2, None);
        drop(pool);
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_join_started_reports_panics() {
        let handles = vec![
            thread::spawn(|| WorkerExit::Cancelled),
            thread::spawn(|| -> WorkerExit { panic!("worker blew up") }),
            thread::spawn(|| WorkerExit::TimedOut),
        ];
        assert_eq!(join_started(handles), 1);
    }
}
