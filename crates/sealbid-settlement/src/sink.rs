//! Value-transfer seam.
//!
//! The engine computes transfer plans; something outside it moves value.
//! [`TransferSink`] is that boundary. [`InMemoryLedger`] is a reference
//! implementation that keeps balances and per-pool escrow in memory and
//! applies a plan all-or-nothing.

use std::collections::HashMap;

use parking_lot::Mutex;
use sealbid_types::{Address, Asset, AuctionError, PoolId, Result, TransferPlan};

/// Executes settlement plans against an external ledger.
pub trait TransferSink: Send + Sync {
    /// Apply every transfer in `plan`, or none of them.
    ///
    /// # Errors
    /// [`AuctionError::TransferFailed`] if the ledger refuses the plan. The
    /// pool then stays unsettled and finalization can be retried.
    fn execute(&self, plan: &TransferPlan) -> Result<()>;
}

/// Which side of a pool an escrowed amount backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Leg {
    /// Seller inventory, paid out by asset transfers.
    Inventory,
    /// Bidder deposits, paid out by refunds and proceeds.
    Deposits,
}

#[derive(Default)]
struct LedgerState {
    /// Per-(address, asset) spendable balances.
    balances: HashMap<(Address, Asset), u128>,
    /// Value held for a pool until its plan executes. Legs stay apart even
    /// when both are denominated in the same asset.
    escrow: HashMap<(PoolId, Leg, Asset), u128>,
}

impl LedgerState {
    fn held(&self, pool_id: PoolId, leg: Leg, asset: &str) -> u128 {
        self.escrow
            .get(&(pool_id, leg, asset.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

/// In-memory value ledger with per-pool escrow.
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the seller's inventory for a pool.
    pub fn escrow_inventory(&self, pool_id: PoolId, asset: &str, quantity: u128) -> Result<()> {
        self.add_escrow(pool_id, Leg::Inventory, asset, quantity)
    }

    /// Hold a bidder's reveal deposit for a pool.
    pub fn escrow_deposit(&self, pool_id: PoolId, payment_asset: &str, amount: u128) -> Result<()> {
        self.add_escrow(pool_id, Leg::Deposits, payment_asset, amount)
    }

    #[must_use]
    pub fn balance(&self, owner: Address, asset: &str) -> u128 {
        self.state
            .lock()
            .balances
            .get(&(owner, asset.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Everything a pool holds in `asset`, both legs together.
    #[must_use]
    pub fn escrowed(&self, pool_id: PoolId, asset: &str) -> u128 {
        let state = self.state.lock();
        state
            .held(pool_id, Leg::Inventory, asset)
            .saturating_add(state.held(pool_id, Leg::Deposits, asset))
    }

    /// Σ balances + Σ escrow for an asset. Executing plans never changes it.
    #[must_use]
    pub fn total_supply(&self, asset: &str) -> u128 {
        let state = self.state.lock();
        let held = state
            .balances
            .iter()
            .filter(|((_, a), _)| a == asset)
            .fold(0u128, |acc, (_, v)| acc.saturating_add(*v));
        state
            .escrow
            .iter()
            .filter(|((_, _, a), _)| a == asset)
            .fold(held, |acc, (_, v)| acc.saturating_add(*v))
    }

    fn add_escrow(&self, pool_id: PoolId, leg: Leg, asset: &str, amount: u128) -> Result<()> {
        let mut state = self.state.lock();
        let slot = state
            .escrow
            .entry((pool_id, leg, asset.to_string()))
            .or_insert(0);
        *slot = slot
            .checked_add(amount)
            .ok_or_else(|| AuctionError::ArithmeticOverflow {
                context: format!("escrow {pool_id} {asset}"),
            })?;
        Ok(())
    }
}

impl TransferSink for InMemoryLedger {
    fn execute(&self, plan: &TransferPlan) -> Result<()> {
        let mut state = self.state.lock();

        // Validate against escrow before touching any balance.
        for (leg, asset, needed) in [
            (Leg::Inventory, &plan.asset, plan.asset_out()),
            (Leg::Deposits, &plan.payment_asset, plan.payment_out()),
        ] {
            let held = state.held(plan.pool_id, leg, asset);
            if held < needed {
                return Err(AuctionError::TransferFailed {
                    reason: format!(
                        "{}: escrow holds {held} {asset}, plan needs {needed}",
                        plan.pool_id
                    ),
                });
            }
        }

        for transfer in &plan.transfers {
            let (leg, asset) = if transfer.is_asset() {
                (Leg::Inventory, &plan.asset)
            } else {
                (Leg::Deposits, &plan.payment_asset)
            };
            if let Some(held) = state.escrow.get_mut(&(plan.pool_id, leg, asset.clone())) {
                *held = held.saturating_sub(transfer.amount());
            }
            let balance = state
                .balances
                .entry((transfer.recipient(), asset.clone()))
                .or_insert(0);
            *balance = balance.saturating_add(transfer.amount());
        }
        Ok(())
    }
}
