//! Pool lifecycle types.
//!
//! Each pool moves through four phases:
//! **COMMIT → REVEAL → FINALIZE_READY → SETTLED**
//!
//! The first two transitions are pure functions of wall-clock time. Only
//! FINALIZE_READY → SETTLED mutates state, and `settled` is the only
//! lifecycle flag that is persisted. [`Pool::phase_at`] is the one place
//! phases are derived; everything else calls it.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, Asset, PoolId};

/// The four phases of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Accepting sealed commitments.
    Commit,
    /// Accepting reveals of earlier commitments.
    Reveal,
    /// Reveal window closed; waiting for a finalize request.
    FinalizeReady,
    /// Clearing computed and applied. Terminal.
    Settled,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit => write!(f, "COMMIT"),
            Self::Reveal => write!(f, "REVEAL"),
            Self::FinalizeReady => write!(f, "FINALIZE_READY"),
            Self::Settled => write!(f, "SETTLED"),
        }
    }
}

/// Phase plus the countdown data the presentation layer displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseInfo {
    pub phase: Phase,
    /// Time until the current phase ends; zero once no deadline remains.
    pub time_remaining: TimeDelta,
    /// Whether any request can still change this pool.
    pub can_interact: bool,
}

/// A single auction instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    pub seller: Address,
    /// The fungible asset being sold.
    pub asset: Asset,
    /// Fixed at creation.
    pub quantity_for_sale: u128,
    /// Reserve price; reveals below it are rejected.
    pub min_price: u128,
    /// No commitments are accepted at or after this instant.
    pub commit_deadline: DateTime<Utc>,
    /// `commit_deadline + reveal window`. Finalization is allowed from here on.
    pub reveal_deadline: DateTime<Utc>,
    pub settled: bool,
    /// 0 until settlement.
    pub clearing_price: u128,
    /// 0 until settlement; never exceeds `quantity_for_sale`.
    pub total_allocated: u128,
    pub created_at: DateTime<Utc>,
}

impl Pool {
    /// Derive the phase at `now`. Never mutates.
    #[must_use]
    pub fn phase_at(&self, now: DateTime<Utc>) -> Phase {
        if now < self.commit_deadline {
            Phase::Commit
        } else if now < self.reveal_deadline {
            Phase::Reveal
        } else if self.settled {
            Phase::Settled
        } else {
            Phase::FinalizeReady
        }
    }

    #[must_use]
    pub fn phase_info(&self, now: DateTime<Utc>) -> PhaseInfo {
        let phase = self.phase_at(now);
        let time_remaining = match phase {
            Phase::Commit => self.commit_deadline - now,
            Phase::Reveal => self.reveal_deadline - now,
            Phase::FinalizeReady | Phase::Settled => TimeDelta::zero(),
        };
        PhaseInfo {
            phase,
            time_remaining,
            can_interact: phase != Phase::Settled,
        }
    }

    /// Quantity that was not sold and goes back to the seller.
    #[must_use]
    pub fn unsold_quantity(&self) -> u128 {
        self.quantity_for_sale.saturating_sub(self.total_allocated)
    }
}

/// Aggregate figures over every pool in a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionStats {
    pub total_pools: usize,
    /// Pools not yet settled.
    pub active_pools: usize,
    pub settled_pools: usize,
    /// Σ quote amount of `total_allocated` at `clearing_price` over settled pools.
    pub total_volume: u128,
    /// Integer mean of clearing prices over settled pools, 0 if none.
    pub average_clearing_price: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_pool() -> (Pool, DateTime<Utc>) {
        let created = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let commit_deadline = created + TimeDelta::hours(1);
        let pool = Pool {
            id: PoolId(1),
            seller: Address::from_byte(1),
            asset: "TOKEN".to_string(),
            quantity_for_sale: 100,
            min_price: 1,
            commit_deadline,
            reveal_deadline: commit_deadline + TimeDelta::minutes(15),
            settled: false,
            clearing_price: 0,
            total_allocated: 0,
            created_at: created,
        };
        (pool, created)
    }

    #[test]
    fn phase_follows_clock() {
        let (pool, created) = make_pool();
        assert_eq!(pool.phase_at(created), Phase::Commit);
        assert_eq!(pool.phase_at(pool.commit_deadline), Phase::Reveal);
        assert_eq!(
            pool.phase_at(pool.reveal_deadline - TimeDelta::seconds(1)),
            Phase::Reveal
        );
        assert_eq!(pool.phase_at(pool.reveal_deadline), Phase::FinalizeReady);
    }

    #[test]
    fn settled_flag_is_terminal() {
        let (mut pool, _) = make_pool();
        pool.settled = true;
        let later = pool.reveal_deadline + TimeDelta::days(30);
        assert_eq!(pool.phase_at(later), Phase::Settled);
        assert!(!pool.phase_info(later).can_interact);
    }

    #[test]
    fn phase_info_countdown() {
        let (pool, created) = make_pool();
        let info = pool.phase_info(created);
        assert_eq!(info.phase, Phase::Commit);
        assert_eq!(info.time_remaining, TimeDelta::hours(1));
        assert!(info.can_interact);

        let info = pool.phase_info(pool.commit_deadline + TimeDelta::minutes(5));
        assert_eq!(info.phase, Phase::Reveal);
        assert_eq!(info.time_remaining, TimeDelta::minutes(10));

        let info = pool.phase_info(pool.reveal_deadline);
        assert_eq!(info.time_remaining, TimeDelta::zero());
        assert!(info.can_interact);
    }

    #[test]
    fn phase_display() {
        assert_eq!(format!("{}", Phase::Commit), "COMMIT");
        assert_eq!(format!("{}", Phase::FinalizeReady), "FINALIZE_READY");
    }

    #[test]
    fn unsold_quantity() {
        let (mut pool, _) = make_pool();
        pool.total_allocated = 30;
        assert_eq!(pool.unsold_quantity(), 70);
    }

    #[test]
    fn pool_serde_roundtrip() {
        let (pool, _) = make_pool();
        let json = serde_json::to_string(&pool).unwrap();
        let back: Pool = serde_json::from_str(&json).unwrap();
        assert_eq!(pool, back);
    }
}
