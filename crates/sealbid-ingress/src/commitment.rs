//! Commitment codec: binds a bidder to (quantity, price, salt) without
//! revealing them.
//!
//! The pre-image is the packed fixed-width layout
//!
//! ```text
//! quantity (32 bytes BE) || price (32 bytes BE) || salt (32 bytes)
//! ```
//!
//! hashed with SHA-256. Field order and widths are part of the format:
//! changing either invalidates every commitment already issued.

use rand::{CryptoRng, RngCore};
use sealbid_types::{
    CommitmentHash, Salt,
    constants::{COMMITMENT_FIELD_WIDTH, SALT_LEN},
};
use sha2::{Digest, Sha256};

const PREIMAGE_LEN: usize = COMMITMENT_FIELD_WIDTH * 2 + SALT_LEN;

/// Compute the commitment hash for a sealed bid. Pure.
#[must_use]
pub fn commit(quantity: u128, price: u128, salt: &Salt) -> CommitmentHash {
    let digest = Sha256::digest(preimage(quantity, price, salt));
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&digest);
    CommitmentHash(hash)
}

/// Recompute the hash from an opening and compare it with `hash`.
#[must_use]
pub fn verify(hash: &CommitmentHash, quantity: u128, price: u128, salt: &Salt) -> bool {
    let actual = commit(quantity, price, salt);
    // No early exit on the first differing byte.
    actual
        .0
        .iter()
        .zip(hash.0.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Draw a fresh salt from a cryptographic RNG.
pub fn random_salt<R: RngCore + CryptoRng>(rng: &mut R) -> Salt {
    let mut bytes = [0u8; SALT_LEN];
    rng.fill_bytes(&mut bytes);
    Salt(bytes)
}

/// Derive a salt from a free-text secret, for clients that let bidders
/// type their own.
#[must_use]
pub fn salt_from_passphrase(passphrase: &str) -> Salt {
    let mut hasher = Sha256::new();
    hasher.update(b"sealbid:salt:v1:");
    hasher.update(passphrase.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; SALT_LEN];
    bytes.copy_from_slice(&digest);
    Salt(bytes)
}

fn preimage(quantity: u128, price: u128, salt: &Salt) -> [u8; PREIMAGE_LEN] {
    let mut buf = [0u8; PREIMAGE_LEN];
    // u128 occupies the low 16 bytes of each 32-byte big-endian word.
    buf[16..COMMITMENT_FIELD_WIDTH].copy_from_slice(&quantity.to_be_bytes());
    buf[COMMITMENT_FIELD_WIDTH + 16..COMMITMENT_FIELD_WIDTH * 2]
        .copy_from_slice(&price.to_be_bytes());
    buf[COMMITMENT_FIELD_WIDTH * 2..].copy_from_slice(salt.as_bytes());
    buf
}
