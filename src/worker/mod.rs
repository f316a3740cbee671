//! Parallel search workers.
//!
//! - `cancel`: the one-way stop signal every worker observes
//! - `cpu`: the generate → test → deliver loop and its delivery policies
//! - `pool`: spawning, statistics and joining of the worker threads

mod cancel;
mod cpu;
mod pool;

pub use cancel::CancellationToken;
pub use cpu::{CpuWorker, DeliveryPolicy, WorkerExit, WorkerStats};
pub use pool::{WorkerPool, RESULT_BUFFER_CAP};
