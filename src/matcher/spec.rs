//! Search parameters and their validation.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::crypto::{ADDRESS_HEX_LEN, ADDRESS_MARKER};
use crate::worker::DeliveryPolicy;

/// Longest prefix accepted unless the caller lowers the bound.
pub const DEFAULT_MAX_PREFIX_LEN: usize = ADDRESS_HEX_LEN;

/// Invalid search parameters. Nothing is started when one of these is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("required count must be greater than zero")]
    ZeroRequiredCount,
    #[error("worker count must be greater than zero")]
    ZeroWorkers,
    #[error("invalid prefix {0:?}: only hex characters (0-9, a-f) are allowed")]
    InvalidPrefix(String),
    #[error("prefix is {len} characters long, at most {max} allowed")]
    PrefixTooLong { len: usize, max: usize },
    #[error("worker timeout must be greater than zero")]
    ZeroTimeout,
    #[error("no address can match: {0}")]
    Unsatisfiable(String),
}

/// What to look for and how hard to look.
///
/// Only obtainable through [`SearchSpecBuilder::build`], so every value in
/// circulation has been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSpec {
    prefix: String,
    excluded: BTreeSet<char>,
    required_count: usize,
    worker_count: usize,
    worker_timeout: Option<Duration>,
    delivery: DeliveryPolicy,
}

impl SearchSpec {
    pub fn builder() -> SearchSpecBuilder {
        SearchSpecBuilder::default()
    }

    /// Required prefix, lowercase, without the `0x` marker.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Forbidden characters, case-folded.
    pub fn excluded(&self) -> &BTreeSet<char> {
        &self.excluded
    }

    /// Whether `c` is forbidden, ignoring case.
    #[inline]
    pub fn is_excluded(&self, c: char) -> bool {
        if c.is_ascii() {
            self.excluded.contains(&c.to_ascii_lowercase())
        } else {
            c.to_lowercase().any(|l| self.excluded.contains(&l))
        }
    }

    pub fn required_count(&self) -> usize {
        self.required_count
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn worker_timeout(&self) -> Option<Duration> {
        self.worker_timeout
    }

    pub fn delivery(&self) -> DeliveryPolicy {
        self.delivery
    }

    /// True when every address qualifies (plain wallet generation).
    pub fn accepts_everything(&self) -> bool {
        self.prefix.is_empty() && self.excluded.is_empty()
    }

    /// Tests an address against this spec. See [`super::matches`].
    #[inline]
    pub fn matches(&self, address: &str) -> bool {
        super::matches(self, address)
    }

    /// Expected number of candidates per match.
    ///
    /// Each prefix character pins one of 16 digits; every remaining body
    /// character must avoid the excluded hex digits.
    pub fn expected_attempts(&self) -> f64 {
        let allowed = 16 - self.excluded_hex_digits();
        let free = ADDRESS_HEX_LEN.saturating_sub(self.prefix.len());
        let p_prefix = 16f64.powi(-(self.prefix.len() as i32));
        let p_rest = (allowed as f64 / 16.0).powi(free as i32);
        1.0 / (p_prefix * p_rest)
    }

    /// Human-readable difficulty estimate.
    pub fn difficulty_description(&self) -> &'static str {
        match self.expected_attempts() {
            d if d <= 1_000.0 => "Very Easy (< 1 second)",
            d if d <= 100_000.0 => "Easy (seconds)",
            d if d <= 10_000_000.0 => "Medium (minutes)",
            d if d <= 1_000_000_000.0 => "Hard (hours)",
            _ => "Very Hard (days or more)",
        }
    }

    fn excluded_hex_digits(&self) -> usize {
        self.excluded.iter().filter(|c| c.is_ascii_hexdigit()).count()
    }
}

/// Collects search parameters and validates them in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct SearchSpecBuilder {
    prefix: String,
    excluded: Vec<char>,
    required_count: usize,
    worker_count: usize,
    worker_timeout: Option<Duration>,
    delivery: DeliveryPolicy,
    max_prefix_len: usize,
}

impl Default for SearchSpecBuilder {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            excluded: Vec::new(),
            required_count: 1,
            worker_count: num_cpus::get(),
            worker_timeout: None,
            delivery: DeliveryPolicy::default(),
            max_prefix_len: DEFAULT_MAX_PREFIX_LEN,
        }
    }
}

impl SearchSpecBuilder {
    /// Required hex prefix. A leading `0x` is accepted and ignored.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Characters that may not appear anywhere in the address body.
    pub fn exclude(mut self, chars: impl IntoIterator<Item = char>) -> Self {
        self.excluded.extend(chars);
        self
    }

    pub fn required_count(mut self, count: usize) -> Self {
        self.required_count = count;
        self
    }

    pub fn worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers;
        self
    }

    /// Per-worker limit on time spent without a delivery.
    pub fn worker_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.worker_timeout = timeout;
        self
    }

    pub fn delivery(mut self, delivery: DeliveryPolicy) -> Self {
        self.delivery = delivery;
        self
    }

    /// Upper bound on prefix length.
    pub fn max_prefix_len(mut self, max: usize) -> Self {
        self.max_prefix_len = max;
        self
    }

    pub fn build(self) -> Result<SearchSpec, ConfigError> {
        if self.required_count == 0 {
            return Err(ConfigError::ZeroRequiredCount);
        }
        if self.worker_count == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.worker_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroTimeout);
        }

        let raw = self.prefix.trim();
        let raw = raw
            .strip_prefix(ADDRESS_MARKER)
            .or_else(|| raw.strip_prefix("0X"))
            .unwrap_or(raw);
        if !raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConfigError::InvalidPrefix(self.prefix.clone()));
        }
        let max = self.max_prefix_len.min(ADDRESS_HEX_LEN);
        if raw.len() > max {
            return Err(ConfigError::PrefixTooLong { len: raw.len(), max });
        }
        let prefix = raw.to_ascii_lowercase();

        let excluded: BTreeSet<char> = self
            .excluded
            .iter()
            .flat_map(|c| c.to_lowercase())
            .collect();

        if let Some(c) = prefix.chars().find(|c| excluded.contains(c)) {
            return Err(ConfigError::Unsatisfiable(format!(
                "prefix contains excluded character '{}'",
                c
            )));
        }
        if prefix.len() < ADDRESS_HEX_LEN
            && "0123456789abcdef".chars().all(|c| excluded.contains(&c))
        {
            return Err(ConfigError::Unsatisfiable(
                "every hex digit is excluded".into(),
            ));
        }

        Ok(SearchSpec {
            prefix,
            excluded,
            required_count: self.required_count,
            worker_count: self.worker_count,
            worker_timeout: self.worker_timeout,
            delivery: self.delivery,
        })
    }
}
