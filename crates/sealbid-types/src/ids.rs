//! Identifiers used throughout Sealbid.
//!
//! Pools are numbered monotonically by the registry. Participants are
//! opaque 20-byte addresses supplied by the wallet layer; the engine only
//! compares them for equality and ordering.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AuctionError, constants::ADDRESS_LEN};

// ---------------------------------------------------------------------------
// PoolId
// ---------------------------------------------------------------------------

/// Monotonically assigned identifier of a single auction pool.
///
/// The first pool created by a registry is `PoolId(1)`; ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PoolId(pub u64);

impl PoolId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Opaque participant identity (seller or bidder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    #[must_use]
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Abbreviated form for log lines, e.g. `0x1234…abcd`.
    #[must_use]
    pub fn short(&self) -> String {
        format!(
            "0x{}…{}",
            hex::encode(&self.0[..2]),
            hex::encode(&self.0[ADDRESS_LEN - 2..])
        )
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Address {
    /// Fixture address with every byte set to `b`.
    #[must_use]
    pub fn from_byte(b: u8) -> Self {
        Self([b; ADDRESS_LEN])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AuctionError;

    /// Parse a hex address, with or without the `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits)
            .map_err(|e| AuctionError::Serialization(format!("address {s}: {e}")))?;
        let bytes: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| {
            AuctionError::Serialization(format!("address {s}: expected {ADDRESS_LEN} bytes"))
        })?;
        Ok(Self(bytes))
    }
}

// ---------------------------------------------------------------------------
// BatchId
// ---------------------------------------------------------------------------

/// Identifies one finalize request. Uses UUIDv7 so batches sort by time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BatchId(pub Uuid);

impl BatchId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch:{}", self.0)
    }
}

/// Type alias for asset identifiers (e.g. a token contract address or "NATIVE").
pub type Asset = String;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_id_next() {
        assert_eq!(PoolId(1).next(), PoolId(2));
        assert_eq!(format!("{}", PoolId(7)), "pool:7");
    }

    #[test]
    fn address_hex_roundtrip() {
        let addr = Address::from_byte(0xab);
        let text = addr.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 2 + ADDRESS_LEN * 2);
        assert_eq!(text.parse::<Address>().unwrap(), addr);
        assert_eq!(text[2..].parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn address_rejects_wrong_length() {
        let err = "0xdeadbeef".parse::<Address>().unwrap_err();
        assert!(matches!(err, AuctionError::Serialization(_)));
    }

    #[test]
    fn address_rejects_non_hex() {
        assert!("0xzz".parse::<Address>().is_err());
    }

    #[test]
    fn address_short_form() {
        let addr = Address::from_byte(0x12);
        assert_eq!(addr.short(), "0x1212…1212");
    }

    #[test]
    fn batch_ids_are_time_ordered() {
        let a = BatchId::new();
        let b = BatchId::new();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn serde_roundtrips() {
        let addr = Address::from_byte(3);
        let json = serde_json::to_string(&addr).unwrap();
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);

        let id = PoolId(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(serde_json::from_str::<PoolId>(&json).unwrap(), id);
    }
}
