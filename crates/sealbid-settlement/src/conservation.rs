//! Supply conservation check for settlement plans.
//!
//! Invariant enforced on every plan before it leaves the engine:
//! ```text
//! Σ(asset transfers)   == quantity escrowed by the seller
//! Σ(payment transfers) == Σ(deposits escrowed by bidders)
//! ```
//!
//! The two legs are tallied separately, so a pool that auctions its own
//! payment asset still balances leg by leg.

use sealbid_types::{AuctionError, Result, TransferPlan};

/// Escrow totals of one pool, per leg.
#[derive(Debug, Default)]
pub struct SupplyConservation {
    inventory: u128,
    deposits: u128,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the seller's inventory escrowed into the pool.
    pub fn record_inventory(&mut self, quantity: u128) -> Result<()> {
        self.inventory = add(self.inventory, quantity, "inventory escrow")?;
        Ok(())
    }

    /// Record one bidder's deposit escrowed into the pool.
    pub fn record_deposit(&mut self, amount: u128) -> Result<()> {
        self.deposits = add(self.deposits, amount, "deposit escrow")?;
        Ok(())
    }

    #[must_use]
    pub fn inventory(&self) -> u128 {
        self.inventory
    }

    #[must_use]
    pub fn deposits(&self) -> u128 {
        self.deposits
    }

    /// Verify that `plan` pays out exactly the escrowed amount on both legs.
    ///
    /// # Errors
    /// Returns [`AuctionError::ConservationViolation`] on any mismatch.
    pub fn verify(&self, plan: &TransferPlan) -> Result<()> {
        let checks = [
            ("asset", &plan.asset, plan.asset_out(), self.inventory),
            ("payment", &plan.payment_asset, plan.payment_out(), self.deposits),
        ];
        for (leg, asset, paid_out, expected) in checks {
            if paid_out != expected {
                return Err(AuctionError::ConservationViolation {
                    reason: format!(
                        "{}: {leg} leg paid out {paid_out} {asset} != escrowed {expected}",
                        plan.pool_id
                    ),
                });
            }
        }
        Ok(())
    }
}

fn add(total: u128, amount: u128, what: &str) -> Result<u128> {
    total
        .checked_add(amount)
        .ok_or_else(|| AuctionError::ArithmeticOverflow {
            context: what.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use sealbid_types::{Address, PoolId, Transfer};

    use super::*;

    fn plan(asset: &str, payment_asset: &str, asset_out: u128, refund: u128) -> TransferPlan {
        TransferPlan {
            pool_id: PoolId(1),
            asset: asset.to_string(),
            payment_asset: payment_asset.to_string(),
            transfers: vec![
                Transfer::AssetToBidder {
                    bidder: Address::from_byte(1),
                    quantity: asset_out,
                },
                Transfer::RefundToBidder {
                    bidder: Address::from_byte(1),
                    amount: refund,
                },
            ],
        }
    }

    #[test]
    fn balanced_plan_passes() {
        let mut sc = SupplyConservation::new();
        sc.record_inventory(100).unwrap();
        sc.record_deposit(30).unwrap();
        sc.record_deposit(20).unwrap();
        assert_eq!(sc.deposits(), 50);
        assert!(sc.verify(&plan("TOKEN", "NATIVE", 100, 50)).is_ok());
    }

    #[test]
    fn same_asset_on_both_legs_balances() {
        let mut sc = SupplyConservation::new();
        sc.record_inventory(100).unwrap();
        sc.record_deposit(20).unwrap();
        assert!(sc.verify(&plan("NATIVE", "NATIVE", 100, 20)).is_ok());
        // Moving value across legs is still caught.
        assert!(sc.verify(&plan("NATIVE", "NATIVE", 90, 30)).is_err());
    }

    #[test]
    fn asset_leak_detected() {
        let mut sc = SupplyConservation::new();
        sc.record_inventory(100).unwrap();
        sc.record_deposit(50).unwrap();
        let err = sc.verify(&plan("TOKEN", "NATIVE", 99, 50)).unwrap_err();
        assert!(matches!(err, AuctionError::ConservationViolation { .. }));
    }

    #[test]
    fn payment_overdraw_detected() {
        let mut sc = SupplyConservation::new();
        sc.record_inventory(100).unwrap();
        sc.record_deposit(50).unwrap();
        assert!(sc.verify(&plan("TOKEN", "NATIVE", 100, 51)).is_err());
    }

    #[test]
    fn escrow_overflow_is_error() {
        let mut sc = SupplyConservation::new();
        sc.record_deposit(u128::MAX).unwrap();
        assert!(sc.record_deposit(1).is_err());
    }
}
