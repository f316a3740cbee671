//! Ethereum address representation and text encodings.

use std::fmt;
use std::str::FromStr;

use tiny_keccak::{Hasher, Keccak};

/// Marker every textual address starts with.
pub const ADDRESS_MARKER: &str = "0x";

/// Number of hex characters in an address body.
pub const ADDRESS_HEX_LEN: usize = 40;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// A 20-byte Ethereum address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 20]);

impl Address {
    /// Creates an address from raw bytes.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Returns the address as raw bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase hex body, no marker.
    #[inline]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Writes `0x` followed by the lowercase body into `buf`, replacing its
    /// contents. Workers reuse one buffer for every candidate they test.
    #[inline]
    pub fn write_prefixed(&self, buf: &mut String) {
        buf.clear();
        buf.reserve(ADDRESS_MARKER.len() + ADDRESS_HEX_LEN);
        buf.push_str(ADDRESS_MARKER);
        for byte in self.0 {
            buf.push(HEX_DIGITS[(byte >> 4) as usize] as char);
            buf.push(HEX_DIGITS[(byte & 0x0f) as usize] as char);
        }
    }

    /// Lowercase hex with the `0x` marker.
    pub fn to_hex_prefixed(&self) -> String {
        let mut out = String::new();
        self.write_prefixed(&mut out);
        out
    }

    /// EIP-55 mixed-case checksum encoding.
    pub fn to_checksum(&self) -> String {
        let body = self.to_hex();
        let mut hasher = Keccak::v256();
        hasher.update(body.as_bytes());
        let mut hash = [0u8; 32];
        hasher.finalize(&mut hash);

        let mut out = String::with_capacity(ADDRESS_MARKER.len() + ADDRESS_HEX_LEN);
        out.push_str(ADDRESS_MARKER);
        for (i, c) in body.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

/// Failure to parse a textual address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    #[error("address must start with 0x")]
    MissingMarker,
    #[error("address body must be 40 hex characters, got {0}")]
    BadLength(usize),
    #[error("address body is not valid hex")]
    NotHex,
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix(ADDRESS_MARKER)
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(AddressParseError::MissingMarker)?;
        if body.len() != ADDRESS_HEX_LEN {
            return Err(AddressParseError::BadLength(body.len()));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(body, &mut bytes).map_err(|_| AddressParseError::NotHex)?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}
