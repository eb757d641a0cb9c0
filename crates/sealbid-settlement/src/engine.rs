//! Auction engine: the single entry point over registry, ledger, clearing
//! and settlement.
//!
//! ```text
//! create_pool ──► commit* ──► reveal* ──► finalize ──► SettlementRecord
//!   registry       ledger      ledger      clear + settle + sink
//! ```
//!
//! Finalizing a pool holds its book exclusively from clearing through
//! `mark_settled`, so two concurrent finalize requests for one pool
//! execute its transfer plan at most once.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sealbid_clearing::{clear, outcome_root};
use sealbid_ingress::{BidLedger, PoolRegistry, Reveal};
use sealbid_types::{
    Address, Allocation, Asset, AuctionConfig, AuctionError, AuctionStats, BatchId, Commitment,
    CommitmentHash, Phase, PhaseInfo, Pool, PoolId, Result, RevealedBid, TransferPlan,
};
use serde::{Deserialize, Serialize};

use crate::{
    calculator,
    scheduler::{self, FinalizeReport, FinalizeStatus, PoolFinalization},
    sink::TransferSink,
};

/// Permanent record of a settled pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub pool_id: PoolId,
    pub batch_id: BatchId,
    pub clearing_price: u128,
    pub total_allocated: u128,
    /// One per revealed bid, in reveal order.
    pub allocations: Vec<Allocation>,
    pub plan: TransferPlan,
    /// Digest of the clearing outcome; equal inputs give equal roots.
    pub outcome_root: [u8; 32],
    pub settled_at: DateTime<Utc>,
}

impl SettlementRecord {
    #[must_use]
    pub fn allocation_of(&self, bidder: &Address) -> Option<&Allocation> {
        self.allocations.iter().find(|a| &a.bidder == bidder)
    }

    #[must_use]
    pub fn outcome_root_hex(&self) -> String {
        hex::encode(self.outcome_root)
    }
}

pub struct AuctionEngine {
    config: AuctionConfig,
    registry: PoolRegistry,
    ledger: BidLedger,
    settlements: DashMap<PoolId, SettlementRecord>,
    sink: Arc<dyn TransferSink>,
}

impl AuctionEngine {
    /// # Errors
    /// `Configuration` if `config` fails validation.
    pub fn new(config: AuctionConfig, sink: Arc<dyn TransferSink>) -> Result<Self> {
        config.validate()?;
        let registry = PoolRegistry::new(&config);
        let ledger = BidLedger::new(config.price_scale());
        tracing::info!(
            reveal_window_secs = config.reveal_window.as_secs(),
            price_decimals = config.price_decimals,
            payment_asset = %config.payment_asset,
            "Auction engine started"
        );
        Ok(Self {
            config,
            registry,
            ledger,
            settlements: DashMap::new(),
            sink,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuctionConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &PoolRegistry {
        &self.registry
    }

    #[must_use]
    pub fn ledger(&self) -> &BidLedger {
        &self.ledger
    }

    // ---- Writes ----

    /// Open a pool. The reveal deadline is `commit_deadline` plus the
    /// configured reveal window.
    ///
    /// # Errors
    /// `InvalidParameters` on zero quantity, zero reserve, or a deadline
    /// not after `now`.
    pub fn create_pool(
        &self,
        seller: Address,
        asset: impl Into<Asset>,
        quantity_for_sale: u128,
        min_price: u128,
        commit_deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<PoolId> {
        let id = self.registry.create_pool(
            seller,
            asset,
            quantity_for_sale,
            min_price,
            commit_deadline,
            now,
        )?;
        self.ledger.open_book(id);
        Ok(id)
    }

    /// # Errors
    /// `PoolNotFound`, `PhaseError` outside COMMIT, `DuplicateCommitment`.
    pub fn commit(
        &self,
        pool_id: PoolId,
        bidder: Address,
        hash: CommitmentHash,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let pool = self.registry.pool(pool_id)?;
        self.ledger.commit(&pool, bidder, hash, now)
    }

    /// # Errors
    /// `PoolNotFound`, or any reveal rejection from [`BidLedger::reveal`].
    pub fn reveal(&self, pool_id: PoolId, reveal: &Reveal, now: DateTime<Utc>) -> Result<RevealedBid> {
        let pool = self.registry.pool(pool_id)?;
        self.ledger.reveal(&pool, reveal, now)
    }

    /// Finalize every named pool against one clock reading.
    ///
    /// Duplicate ids are processed once. Each pool gets its own result;
    /// none of them aborts the rest.
    pub fn finalize(&self, pool_ids: &[PoolId], now: DateTime<Utc>) -> FinalizeReport {
        let batch_id = BatchId::new();
        let outcomes: Vec<PoolFinalization> =
            scheduler::run_batch(pool_ids, |id| self.finalize_pool(id, now, batch_id))
                .into_iter()
                .map(|(pool_id, result)| PoolFinalization { pool_id, result })
                .collect();

        let report = FinalizeReport {
            batch_id,
            evaluated_at: now,
            outcomes,
        };
        tracing::info!(
            batch = %batch_id,
            requested = pool_ids.len(),
            settled = report.count(FinalizeStatus::Settled),
            already_settled = report.count(FinalizeStatus::AlreadySettled),
            not_ready = report.count(FinalizeStatus::NotReady),
            rejected = report.count(FinalizeStatus::Rejected),
            "Finalize batch complete"
        );
        report
    }

    fn finalize_pool(
        &self,
        pool_id: PoolId,
        now: DateTime<Utc>,
        batch_id: BatchId,
    ) -> Result<SettlementRecord> {
        let result = self.try_finalize_pool(pool_id, now, batch_id);
        match &result {
            Ok(record) => tracing::info!(
                batch = %batch_id,
                pool = %pool_id,
                clearing_price = %self.config.price_scale().format(record.clearing_price),
                total_allocated = record.total_allocated,
                transfers = record.plan.transfers.len(),
                outcome_root = %record.outcome_root_hex(),
                "Pool settled"
            ),
            Err(e @ (AuctionError::AlreadySettled(_) | AuctionError::NotFinalizable(_))) => {
                tracing::debug!(batch = %batch_id, pool = %pool_id, reason = %e, "Pool skipped");
            }
            Err(e) => {
                tracing::warn!(batch = %batch_id, pool = %pool_id, error = %e, "Pool finalization failed");
            }
        }
        result
    }

    fn try_finalize_pool(
        &self,
        pool_id: PoolId,
        now: DateTime<Utc>,
        batch_id: BatchId,
    ) -> Result<SettlementRecord> {
        let pool = self.registry.pool(pool_id)?;
        if pool.settled {
            return Err(AuctionError::AlreadySettled(pool_id));
        }

        self.ledger.with_closed_book(&pool, now, |bids| -> Result<SettlementRecord> {
            // A concurrent finalize may have settled the pool while we
            // waited for the book.
            let pool = self.registry.pool(pool_id)?;
            if pool.settled {
                return Err(AuctionError::AlreadySettled(pool_id));
            }

            let outcome = clear(bids, pool.quantity_for_sale, pool.min_price);
            let root = outcome_root(pool_id, &outcome);
            let settlement = calculator::settle(
                &pool,
                bids,
                &outcome,
                self.config.price_scale(),
                &self.config.payment_asset,
            )?;

            self.sink.execute(&settlement.plan)?;
            self.registry.mark_settled(
                pool_id,
                outcome.clearing_price,
                outcome.total_allocated,
                now,
            )?;

            let record = SettlementRecord {
                pool_id,
                batch_id,
                clearing_price: outcome.clearing_price,
                total_allocated: outcome.total_allocated,
                allocations: settlement.allocations,
                plan: settlement.plan,
                outcome_root: root,
                settled_at: now,
            };
            self.settlements.insert(pool_id, record.clone());
            Ok(record)
        })?
    }

    // ---- Reads ----

    /// # Errors
    /// `PoolNotFound`.
    pub fn pool(&self, pool_id: PoolId) -> Result<Pool> {
        self.registry.pool(pool_id)
    }

    /// # Errors
    /// `PoolNotFound`.
    pub fn phase_of(&self, pool_id: PoolId, now: DateTime<Utc>) -> Result<Phase> {
        self.registry.phase_of(pool_id, now)
    }

    /// # Errors
    /// `PoolNotFound`.
    pub fn phase_info(&self, pool_id: PoolId, now: DateTime<Utc>) -> Result<PhaseInfo> {
        self.registry.phase_info(pool_id, now)
    }

    /// # Errors
    /// `PoolNotFound`.
    pub fn commitment_of(&self, pool_id: PoolId, bidder: &Address) -> Result<Option<Commitment>> {
        self.ledger.commitment_of(pool_id, bidder)
    }

    /// Settlement record of a settled pool, `None` while unsettled.
    ///
    /// # Errors
    /// `PoolNotFound`.
    pub fn settlement(&self, pool_id: PoolId) -> Result<Option<SettlementRecord>> {
        self.registry.pool(pool_id)?;
        Ok(self.settlements.get(&pool_id).map(|r| r.value().clone()))
    }

    /// A bidder's allocation in a settled pool.
    ///
    /// # Errors
    /// `PoolNotFound`.
    pub fn allocation_of(&self, pool_id: PoolId, bidder: &Address) -> Result<Option<Allocation>> {
        Ok(self
            .settlement(pool_id)?
            .and_then(|record| record.allocation_of(bidder).cloned()))
    }

    /// # Errors
    /// `ArithmeticOverflow` if total volume does not fit in `u128`.
    pub fn stats(&self) -> Result<AuctionStats> {
        self.registry.stats()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use sealbid_ingress::commitment;
    use sealbid_types::Salt;

    use super::*;
    use crate::sink::InMemoryLedger;

    fn engine() -> AuctionEngine {
        let config = AuctionConfig {
            price_decimals: 0,
            ..AuctionConfig::default()
        };
        AuctionEngine::new(config, Arc::new(InMemoryLedger::new())).unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let config = AuctionConfig {
            payment_asset: String::new(),
            ..AuctionConfig::default()
        };
        let err = AuctionEngine::new(config, Arc::new(InMemoryLedger::new())).err();
        assert!(matches!(err, Some(AuctionError::Configuration(_))));
    }

    #[test]
    fn settlement_absent_until_finalized() {
        let engine = engine();
        let now = Utc::now();
        let id = engine
            .create_pool(Address::from_byte(9), "TKN", 10, 1, now + TimeDelta::minutes(5), now)
            .unwrap();
        assert_eq!(engine.settlement(id).unwrap(), None);
        assert!(matches!(
            engine.settlement(PoolId(99)),
            Err(AuctionError::PoolNotFound(_))
        ));
    }

    #[test]
    fn commit_and_reveal_route_to_the_pool() {
        let engine = engine();
        let now = Utc::now();
        let commit_deadline = now + TimeDelta::minutes(5);
        let id = engine
            .create_pool(Address::from_byte(9), "TKN", 10, 1, commit_deadline, now)
            .unwrap();

        let bidder = Address::from_byte(1);
        let salt = Salt::from_bytes([4; 32]);
        engine
            .commit(id, bidder, commitment::commit(5, 2, &salt), now)
            .unwrap();
        assert!(!engine.commitment_of(id, &bidder).unwrap().unwrap().revealed);

        let reveal = Reveal {
            bidder,
            quantity: 5,
            price: 2,
            salt,
            deposit_paid: 10,
        };
        let bid = engine
            .reveal(id, &reveal, commit_deadline + TimeDelta::seconds(1))
            .unwrap();
        assert_eq!(bid.quantity, 5);
        assert!(engine.commitment_of(id, &bidder).unwrap().unwrap().revealed);
    }
}
