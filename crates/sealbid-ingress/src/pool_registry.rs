//! Pool registry: owns every pool record and its lifecycle flag.
//!
//! Pools live in an arena keyed by [`PoolId`]; operations on different
//! pools touch different shards and never wait on each other.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use sealbid_types::{
    Address, Asset, AuctionConfig, AuctionError, AuctionStats, Phase, PhaseInfo, Pool, PoolId,
    PriceScale, Result,
};

/// Creates pools, answers phase queries, and records settlement.
pub struct PoolRegistry {
    pools: DashMap<PoolId, Pool>,
    /// Last id handed out; ids start at 1.
    last_id: AtomicU64,
    reveal_window: TimeDelta,
    scale: PriceScale,
}

impl PoolRegistry {
    #[must_use]
    pub fn new(config: &AuctionConfig) -> Self {
        Self {
            pools: DashMap::new(),
            last_id: AtomicU64::new(0),
            reveal_window: config.reveal_delta(),
            scale: config.price_scale(),
        }
    }

    /// Register a new pool and return its fresh id.
    ///
    /// # Errors
    /// `InvalidParameters` if the quantity or reserve is zero, the asset is
    /// empty, or `commit_deadline` is not strictly after `now`.
    pub fn create_pool(
        &self,
        seller: Address,
        asset: impl Into<Asset>,
        quantity_for_sale: u128,
        min_price: u128,
        commit_deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<PoolId> {
        let asset = asset.into();
        if quantity_for_sale == 0 {
            return Err(invalid("quantity_for_sale must be positive"));
        }
        if min_price == 0 {
            return Err(invalid("min_price must be positive"));
        }
        if asset.is_empty() {
            return Err(invalid("asset must be set"));
        }
        if commit_deadline <= now {
            return Err(invalid("commit_deadline must be in the future"));
        }
        let reveal_deadline = commit_deadline
            .checked_add_signed(self.reveal_window)
            .ok_or_else(|| invalid("reveal deadline out of range"))?;

        let id = PoolId(self.last_id.fetch_add(1, Ordering::Relaxed) + 1);
        let pool = Pool {
            id,
            seller,
            asset,
            quantity_for_sale,
            min_price,
            commit_deadline,
            reveal_deadline,
            settled: false,
            clearing_price: 0,
            total_allocated: 0,
            created_at: now,
        };

        tracing::info!(
            pool = %id,
            seller = %seller,
            asset = %pool.asset,
            quantity = quantity_for_sale,
            min_price,
            commit_deadline = %commit_deadline,
            reveal_deadline = %reveal_deadline,
            "Pool created"
        );

        self.pools.insert(id, pool);
        Ok(id)
    }

    /// Snapshot of a pool record.
    pub fn pool(&self, id: PoolId) -> Result<Pool> {
        self.pools
            .get(&id)
            .map(|p| p.clone())
            .ok_or(AuctionError::PoolNotFound(id))
    }

    /// Phase of a pool at `now`. Never mutates.
    pub fn phase_of(&self, id: PoolId, now: DateTime<Utc>) -> Result<Phase> {
        self.pools
            .get(&id)
            .map(|p| p.phase_at(now))
            .ok_or(AuctionError::PoolNotFound(id))
    }

    pub fn phase_info(&self, id: PoolId, now: DateTime<Utc>) -> Result<PhaseInfo> {
        self.pools
            .get(&id)
            .map(|p| p.phase_info(now))
            .ok_or(AuctionError::PoolNotFound(id))
    }

    /// Persist the clearing outcome and flip the pool to SETTLED.
    ///
    /// # Errors
    /// - `AlreadySettled` if the pool was settled before
    /// - `NotFinalizable` if `now` is before the reveal deadline
    /// - `InvalidParameters` if the outcome breaks the pool's invariants
    pub fn mark_settled(
        &self,
        id: PoolId,
        clearing_price: u128,
        total_allocated: u128,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut pool = self
            .pools
            .get_mut(&id)
            .ok_or(AuctionError::PoolNotFound(id))?;

        if pool.settled {
            return Err(AuctionError::AlreadySettled(id));
        }
        if now < pool.reveal_deadline {
            return Err(AuctionError::NotFinalizable(id));
        }
        if total_allocated > pool.quantity_for_sale {
            return Err(invalid(&format!(
                "allocated {total_allocated} exceeds supply {}",
                pool.quantity_for_sale
            )));
        }
        if total_allocated > 0 && clearing_price < pool.min_price {
            return Err(invalid(&format!(
                "clearing price {clearing_price} below reserve {}",
                pool.min_price
            )));
        }

        pool.settled = true;
        pool.clearing_price = clearing_price;
        pool.total_allocated = total_allocated;
        Ok(())
    }

    /// All pools, ordered by id.
    #[must_use]
    pub fn pools(&self) -> Vec<Pool> {
        self.collect(|_| true)
    }

    #[must_use]
    pub fn pools_in_phase(&self, phase: Phase, now: DateTime<Utc>) -> Vec<Pool> {
        self.collect(|p| p.phase_at(now) == phase)
    }

    /// Pools not yet settled.
    #[must_use]
    pub fn active_pools(&self) -> Vec<Pool> {
        self.collect(|p| !p.settled)
    }

    #[must_use]
    pub fn settled_pools(&self) -> Vec<Pool> {
        self.collect(|p| p.settled)
    }

    #[must_use]
    pub fn pools_by_seller(&self, seller: &Address) -> Vec<Pool> {
        self.collect(|p| p.seller == *seller)
    }

    #[must_use]
    pub fn pools_by_asset(&self, asset: &str) -> Vec<Pool> {
        self.collect(|p| p.asset == asset)
    }

    /// Aggregate counts, traded volume and mean clearing price.
    pub fn stats(&self) -> Result<AuctionStats> {
        let pools = self.pools();
        let settled: Vec<&Pool> = pools.iter().filter(|p| p.settled).collect();

        let mut total_volume: u128 = 0;
        let mut price_sum: u128 = 0;
        for pool in &settled {
            let volume = self
                .scale
                .quote_amount(pool.total_allocated, pool.clearing_price)?;
            total_volume = total_volume
                .checked_add(volume)
                .ok_or_else(|| overflow("total volume"))?;
            price_sum = price_sum
                .checked_add(pool.clearing_price)
                .ok_or_else(|| overflow("clearing price sum"))?;
        }
        let average_clearing_price = match u128::try_from(settled.len()) {
            Ok(0) | Err(_) => 0,
            Ok(n) => price_sum / n,
        };

        Ok(AuctionStats {
            total_pools: pools.len(),
            active_pools: pools.len() - settled.len(),
            settled_pools: settled.len(),
            total_volume,
            average_clearing_price,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    fn collect(&self, keep: impl Fn(&Pool) -> bool) -> Vec<Pool> {
        let mut out: Vec<Pool> = self
            .pools
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        out.sort_by_key(|p| p.id);
        out
    }
}

fn invalid(reason: &str) -> AuctionError {
    AuctionError::InvalidParameters {
        reason: reason.to_string(),
    }
}

fn overflow(context: &str) -> AuctionError {
    AuctionError::ArithmeticOverflow {
        context: context.to_string(),
    }
}
