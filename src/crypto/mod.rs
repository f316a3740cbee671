//! Key generation and address derivation.
//!
//! - `address`: 20-byte Ethereum address and its text encodings
//! - `keypair`: secp256k1 secret → address derivation (Keccak-256)
//! - `generator`: random candidate production for the worker loop

mod address;
mod generator;
mod keypair;

pub use address::{Address, AddressParseError, ADDRESS_HEX_LEN, ADDRESS_MARKER};
pub use generator::{Candidate, CandidateSource, EntropyError, KeyGenerator, MAX_ENTROPY_ATTEMPTS};
pub use keypair::Keypair;
