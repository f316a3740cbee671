//! Random candidate generation.

use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::{Secp256k1, SignOnly};

use super::{Address, Keypair};
use crate::wallet::Wallet;

/// How many times a worker retries one iteration after an [`EntropyError`]
/// before giving up.
pub const MAX_ENTROPY_ATTEMPTS: u32 = 3;

/// A freshly generated secret and the address it derives.
///
/// Lives for a single worker iteration; matching candidates are consumed
/// into a [`Wallet`].
#[derive(Clone)]
pub struct Candidate {
    secret_key: [u8; 32],
    address: Address,
}

impl Candidate {
    pub fn new(secret_key: [u8; 32], address: Address) -> Self {
        Self { secret_key, address }
    }

    #[inline]
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key)
    }

    /// Turns a matching candidate into the record handed to the collector.
    pub fn into_wallet(self, worker_id: usize) -> Wallet {
        Wallet::new(self.address.to_checksum(), self.private_key_hex(), worker_id)
    }
}

impl From<Keypair> for Candidate {
    fn from(keypair: Keypair) -> Self {
        Self::new(*keypair.private_key_bytes(), *keypair.address())
    }
}

/// Failure to produce a candidate. Always worth retrying.
#[derive(Debug, thiserror::Error)]
pub enum EntropyError {
    #[error("entropy source failed: {0}")]
    Source(#[source] rand::Error),
    #[error("drawn bytes are not a valid secp256k1 secret key")]
    InvalidScalar,
}

/// Anything that can hand workers candidates to test.
///
/// Implementations are shared by every worker of a pool and must not carry
/// entropy over from one call to the next.
pub trait CandidateSource: Send + Sync {
    fn next_candidate(&self) -> Result<Candidate, EntropyError>;
}

/// Draws every secret straight from the operating system CSPRNG.
pub struct KeyGenerator {
    secp: Secp256k1<SignOnly>,
}

impl KeyGenerator {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::signing_only(),
        }
    }

    /// Generates one keypair from fresh OS randomness.
    pub fn generate(&self) -> Result<Keypair, EntropyError> {
        let mut secret = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut secret)
            .map_err(EntropyError::Source)?;
        Keypair::from_secret_key(&self.secp, secret).map_err(|_| EntropyError::InvalidScalar)
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CandidateSource for KeyGenerator {
    #[inline]
    fn next_candidate(&self) -> Result<Candidate, EntropyError> {
        self.generate().map(Candidate::from)
    }
}
