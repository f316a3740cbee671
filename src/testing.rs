//! Candidate sources with engineered addresses for exercising the worker
//! pool without waiting on real key search.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::crypto::{Address, Candidate, CandidateSource, EntropyError};

/// Unique secret and an address whose first byte is `lead` and whose tail
/// encodes `n`.
fn numbered(lead: u8, n: u64) -> Candidate {
    let mut secret = [0u8; 32];
    secret[24..].copy_from_slice(&(n + 1).to_be_bytes());

    let mut bytes = [0u8; 20];
    bytes[0] = lead;
    bytes[12..].copy_from_slice(&n.to_be_bytes());
    Candidate::new(secret, Address::from_bytes(bytes))
}

fn lead_byte(prefix: &str) -> u8 {
    u8::from_str_radix(prefix, 16).expect("two hex digits")
}

/// Every candidate starts with the given two-digit prefix.
pub struct AlwaysMatching {
    lead: u8,
    counter: AtomicU64,
}

impl AlwaysMatching {
    pub fn new(prefix: &str) -> Self {
        Self {
            lead: lead_byte(prefix),
            counter: AtomicU64::new(0),
        }
    }
}

impl CandidateSource for AlwaysMatching {
    fn next_candidate(&self) -> Result<Candidate, EntropyError> {
        Ok(numbered(self.lead, self.counter.fetch_add(1, Ordering::Relaxed)))
    }
}

/// Starts with `0x00`, so never matches a prefix beginning with another
/// digit.
#[derive(Default)]
pub struct NeverMatching {
    counter: AtomicU64,
}

impl CandidateSource for NeverMatching {
    fn next_candidate(&self) -> Result<Candidate, EntropyError> {
        Ok(numbered(0x00, self.counter.fetch_add(1, Ordering::Relaxed)))
    }
}

/// Hands out exactly `matches` matching candidates across all callers, then
/// only non-matching ones.
pub struct Scripted {
    lead: u8,
    remaining: AtomicUsize,
    counter: AtomicU64,
}

impl Scripted {
    pub fn new(prefix: &str, matches: usize) -> Self {
        Self {
            lead: lead_byte(prefix),
            remaining: AtomicUsize::new(matches),
            counter: AtomicU64::new(0),
        }
    }
}

impl CandidateSource for Scripted {
    fn next_candidate(&self) -> Result<Candidate, EntropyError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let hit = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| left.checked_sub(1))
            .is_ok();
        Ok(numbered(if hit { self.lead } else { 0x00 }, n))
    }
}

/// Always fails.
#[derive(Default)]
pub struct Failing {
    calls: AtomicU64,
}

impl Failing {
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl CandidateSource for Failing {
    fn next_candidate(&self) -> Result<Candidate, EntropyError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Err(EntropyError::InvalidScalar)
    }
}

/// Fails every other call, delegating the rest.
pub struct Flaky<S> {
    inner: S,
    calls: AtomicU64,
}

impl<S> Flaky<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: AtomicU64::new(0),
        }
    }
}

impl<S: CandidateSource> CandidateSource for Flaky<S> {
    fn next_candidate(&self) -> Result<Candidate, EntropyError> {
        if self.calls.fetch_add(1, Ordering::Relaxed) % 2 == 0 {
            Err(EntropyError::InvalidScalar)
        } else {
            self.inner.next_candidate()
        }
    }
}
