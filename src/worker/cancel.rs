//! One-way cancellation shared by the collector, the workers and signal
//! handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

/// Broadcast stop signal. `Active → Cancelled`, never back.
///
/// Checking is a single atomic load. Blocking code can instead wait on
/// [`signal`](Self::signal), a channel that disconnects on cancellation.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    /// Dropped on cancel to disconnect `signal`. Nothing is ever sent.
    closer: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (closer, signal) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                closer: Mutex::new(Some(closer)),
                signal,
            }),
        }
    }

    /// Cancels the token. Returns `true` only for the call that actually
    /// performed the transition; later calls are no-ops.
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.inner
            .closer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        true
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Receiver that disconnects once the token is cancelled. Usable in
    /// `crossbeam_channel::select!`.
    pub fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }

    /// Blocks until cancelled or `timeout` elapses. Returns whether the token
    /// is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        match self.inner.signal.recv_timeout(timeout) {
            Err(RecvTimeoutError::Disconnected) => true,
            _ => self.is_cancelled(),
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
