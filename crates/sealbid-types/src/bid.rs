//! Commitment and revealed-bid records kept by the bid ledger.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    Address, AuctionError,
    constants::{COMMITMENT_HASH_LEN, SALT_LEN},
};

/// Binding, hiding digest of a sealed bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitmentHash(pub [u8; COMMITMENT_HASH_LEN]);

impl fmt::Display for CommitmentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for CommitmentHash {
    type Err = AuctionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed(s, "commitment hash").map(Self)
    }
}

/// Secret blinding bytes chosen by the bidder at commit time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Salt(pub [u8; SALT_LEN]);

impl Salt {
    #[must_use]
    pub fn from_bytes(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

// Salts are secrets until reveal; keep them out of debug logs.
impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt(..)")
    }
}

impl FromStr for Salt {
    type Err = AuctionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed(s, "salt").map(Self)
    }
}

fn parse_fixed<const N: usize>(s: &str, what: &str) -> Result<[u8; N], AuctionError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let bytes =
        hex::decode(digits).map_err(|e| AuctionError::Serialization(format!("{what}: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| AuctionError::Serialization(format!("{what}: expected {N} bytes")))
}

/// One sealed bid per (pool, bidder). Immutable once created; opened at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub hash: CommitmentHash,
    pub revealed: bool,
}

/// An opened commitment backed by a deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedBid {
    pub bidder: Address,
    /// Units requested; always positive.
    pub quantity: u128,
    /// Fixed-point limit price; at least the pool's reserve.
    pub price: u128,
    /// Exactly the quote amount of `quantity` at `price`.
    pub deposit_paid: u128,
    /// Per-pool arrival order of accepted reveals, starting at 0.
    pub reveal_seq: u64,
}

#[cfg(any(test, feature = "test-helpers"))]
impl RevealedBid {
    /// Fixture bid from bidder `Address::from_byte(bidder)` with a deposit
    /// of `quantity * price` (zero price decimals).
    #[must_use]
    pub fn dummy(bidder: u8, quantity: u128, price: u128, reveal_seq: u64) -> Self {
        Self {
            bidder: Address::from_byte(bidder),
            quantity,
            price,
            deposit_paid: quantity * price,
            reveal_seq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_hash_hex_roundtrip() {
        let hash = CommitmentHash([0x5a; COMMITMENT_HASH_LEN]);
        let text = hash.to_string();
        assert_eq!(text.parse::<CommitmentHash>().unwrap(), hash);
    }

    #[test]
    fn salt_parse_rejects_short_input() {
        assert!("0x0102".parse::<Salt>().is_err());
    }

    #[test]
    fn salt_debug_is_redacted() {
        let salt = Salt::from_bytes([7; SALT_LEN]);
        assert_eq!(format!("{salt:?}"), "Salt(..)");
    }

    #[test]
    fn dummy_bid_deposit() {
        let bid = RevealedBid::dummy(2, 60, 2, 1);
        assert_eq!(bid.deposit_paid, 120);
        assert_eq!(bid.bidder, Address::from_byte(2));
    }

    #[test]
    fn revealed_bid_serde_roundtrip() {
        let bid = RevealedBid::dummy(1, 50, 3, 0);
        let json = serde_json::to_string(&bid).unwrap();
        let back: RevealedBid = serde_json::from_str(&json).unwrap();
        assert_eq!(bid, back);
    }
}
