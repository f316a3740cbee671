//! secp256k1 keypair with its derived Ethereum address.

use secp256k1::{PublicKey, Secp256k1, SecretKey, Signing};
use tiny_keccak::{Hasher, Keccak};

use super::Address;

/// A secret key together with the address it controls.
#[derive(Clone)]
pub struct Keypair {
    /// The private key bytes (32 bytes)
    secret_key: [u8; 32],
    /// The derived Ethereum address
    address: Address,
}

impl Keypair {
    /// Derives the keypair for `secret_bytes`.
    ///
    /// Fails when the bytes are zero or not below the curve order.
    pub fn from_secret_key<C: Signing>(
        secp: &Secp256k1<C>,
        secret_bytes: [u8; 32],
    ) -> Result<Self, secp256k1::Error> {
        let secret_key = SecretKey::from_slice(&secret_bytes)?;
        let public_key = PublicKey::from_secret_key(secp, &secret_key);

        Ok(Self {
            secret_key: secret_bytes,
            address: derive_address(&public_key),
        })
    }

    /// Returns the private key as a hex string (without 0x prefix).
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key)
    }

    /// Returns the private key bytes.
    pub fn private_key_bytes(&self) -> &[u8; 32] {
        &self.secret_key
    }

    /// Returns a reference to the derived address.
    #[inline]
    pub fn address(&self) -> &Address {
        &self.address
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print the secret
        f.debug_struct("Keypair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Keccak-256 over the 64-byte uncompressed public key (0x04 tag stripped),
/// keeping the last 20 bytes.
#[inline]
fn derive_address(public_key: &PublicKey) -> Address {
    let public_key_bytes = public_key.serialize_uncompressed();

    let mut hasher = Keccak::v256();
    hasher.update(&public_key_bytes[1..]);
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);

    let mut address_bytes = [0u8; 20];
    address_bytes.copy_from_slice(&hash[12..]);
    Address::from_bytes(address_bytes)
}
