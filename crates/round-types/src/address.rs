//! Address derivation.
//!
//! Addresses are a hex digest of a delegate's public key. Keeping the
//! derivation pure and dependency-free lets both the engine and any store
//! implementation compute the same address without round-tripping through a
//! store call.

use crate::PublicKey;
use blake3::Hasher as Blake3;

const ADDRESS_DOMAIN: &[u8] = b"round-engine-address";

/// Derive the canonical address for a delegate's public key.
///
/// Deterministic and pure: the same public key always yields the same
/// address, independent of account store state.
pub fn generate_address(public_key: &PublicKey) -> String {
    let mut hasher = Blake3::new();
    hasher.update(ADDRESS_DOMAIN);
    hasher.update(public_key);
    let hash = hasher.finalize();
    hex::encode(&hash.as_bytes()[..20])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_and_stable_length() {
        let pk = [7u8; 32];
        let a1 = generate_address(&pk);
        let a2 = generate_address(&pk);
        assert_eq!(a1, a2);
        assert_eq!(a1.len(), 40);
    }

    #[test]
    fn distinguishes_keys() {
        assert_ne!(generate_address(&[1u8; 32]), generate_address(&[2u8; 32]));
    }
}
