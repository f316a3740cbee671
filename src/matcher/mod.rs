//! Address matching.
//!
//! A [`SearchSpec`] describes the wanted addresses: a hex prefix after the
//! `0x` marker plus a set of characters that may not appear anywhere in the
//! body. [`matches`] is the pure predicate every worker runs per candidate.

mod predicate;
mod spec;

pub use predicate::matches;
pub use spec::{ConfigError, SearchSpec, SearchSpecBuilder, DEFAULT_MAX_PREFIX_LEN};
