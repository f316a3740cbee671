//! # vanity_wallets
//!
//! Concurrent brute-force search for Ethereum keypairs whose address has a
//! given hex prefix and avoids a set of characters.
//!
//! ## Architecture
//!
//! - `crypto`: key generation and address derivation
//! - `matcher`: search parameters and the address predicate
//! - `worker`: worker threads, delivery policies and cancellation
//! - `collector`: quota-bounded consumer of worker results
//! - `search`: blocking entry point tying the above together
//! - `config` / `report`: command-line flags and wallet output

pub mod collector;
pub mod config;
pub mod crypto;
pub mod matcher;
pub mod report;
pub mod search;
pub mod wallet;
pub mod worker;

#[cfg(test)]
mod testing;

pub use collector::{Collector, CollectorReport, Progress, ProgressSink, ResultSink};
pub use config::Config;
pub use crypto::{Address, Candidate, CandidateSource, EntropyError, KeyGenerator, Keypair};
pub use matcher::{matches, ConfigError, SearchSpec, SearchSpecBuilder};
pub use search::{run_search, search_with_source, Search, SearchError, SearchOutcome, SearchSummary};
pub use wallet::Wallet;
pub use worker::{CancellationToken, DeliveryPolicy, WorkerExit, WorkerPool};
