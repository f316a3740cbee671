//! The record produced for every matching candidate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A keypair whose address satisfied the search.
///
/// Built once by the worker that found it and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// EIP-55 checksummed address with `0x` marker
    pub address: String,
    /// Private key, 64 lowercase hex characters, no marker
    pub private_key: String,
    /// When the worker found it
    pub created_at: DateTime<Utc>,
    /// Worker that found it
    pub worker_id: usize,
}

impl Wallet {
    pub fn new(address: String, private_key: String, worker_id: usize) -> Self {
        Self {
            address,
            private_key,
            created_at: Utc::now(),
            worker_id,
        }
    }

    /// Lowercase form of the address, as the matcher sees it.
    pub fn address_lowercase(&self) -> String {
        self.address.to_ascii_lowercase()
    }
}
