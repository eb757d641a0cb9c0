//! Settlement calculator: turns a clearing outcome into allocations and a
//! transfer plan.
//!
//! For each revealed bid:
//! ```text
//! cost   = quote(filled_quantity, clearing_price)
//! refund = deposit_paid - cost
//! ```
//! Refunds are never negative: every filled bid bid at least the clearing
//! price and was filled at most its own quantity. The seller receives the
//! winners' costs and any unsold quantity.

use std::collections::HashMap;

use sealbid_clearing::ClearingOutcome;
use sealbid_types::{
    Allocation, AuctionError, Pool, PriceScale, Result, RevealedBid, Transfer, TransferPlan,
};
use serde::{Deserialize, Serialize};

use crate::conservation::SupplyConservation;

/// Allocations plus the plan that realizes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// One per revealed bid, in reveal order.
    pub allocations: Vec<Allocation>,
    pub plan: TransferPlan,
}

/// Compute allocations and the transfer plan for a cleared pool.
///
/// # Errors
/// - `ArithmeticOverflow` if a cost or total does not fit in `u128`
/// - `ConservationViolation` if a refund would be negative or the plan
///   does not pay out exactly what was escrowed
pub fn settle(
    pool: &Pool,
    bids: &[RevealedBid],
    outcome: &ClearingOutcome,
    scale: PriceScale,
    payment_asset: &str,
) -> Result<Settlement> {
    let filled_by_seq: HashMap<u64, u128> = outcome
        .fills
        .iter()
        .map(|f| (f.reveal_seq, f.filled))
        .collect();

    let mut supply = SupplyConservation::new();
    supply.record_inventory(pool.quantity_for_sale)?;

    let mut allocations = Vec::with_capacity(bids.len());
    let mut asset_transfers = Vec::new();
    let mut refund_transfers = Vec::new();
    let mut proceeds: u128 = 0;

    for bid in bids {
        supply.record_deposit(bid.deposit_paid)?;

        let filled_quantity = filled_by_seq.get(&bid.reveal_seq).copied().unwrap_or(0);
        let cost = scale.quote_amount(filled_quantity, outcome.clearing_price)?;
        let refund_amount = bid.deposit_paid.checked_sub(cost).ok_or_else(|| {
            AuctionError::ConservationViolation {
                reason: format!(
                    "{}: cost {cost} exceeds deposit {} of {}",
                    pool.id, bid.deposit_paid, bid.bidder
                ),
            }
        })?;
        proceeds = proceeds
            .checked_add(cost)
            .ok_or_else(|| AuctionError::ArithmeticOverflow {
                context: format!("{} proceeds", pool.id),
            })?;

        if filled_quantity > 0 {
            asset_transfers.push(Transfer::AssetToBidder {
                bidder: bid.bidder,
                quantity: filled_quantity,
            });
        }
        if refund_amount > 0 {
            refund_transfers.push(Transfer::RefundToBidder {
                bidder: bid.bidder,
                amount: refund_amount,
            });
        }
        allocations.push(Allocation {
            bidder: bid.bidder,
            filled_quantity,
            cost,
            refund_amount,
        });
    }

    let unsold = pool
        .quantity_for_sale
        .checked_sub(outcome.total_allocated)
        .ok_or_else(|| AuctionError::ConservationViolation {
            reason: format!(
                "{}: allocated {} exceeds supply {}",
                pool.id, outcome.total_allocated, pool.quantity_for_sale
            ),
        })?;

    let mut transfers = asset_transfers;
    if unsold > 0 {
        transfers.push(Transfer::UnsoldToSeller {
            seller: pool.seller,
            quantity: unsold,
        });
    }
    transfers.extend(refund_transfers);
    if proceeds > 0 {
        transfers.push(Transfer::ProceedsToSeller {
            seller: pool.seller,
            amount: proceeds,
        });
    }

    let plan = TransferPlan {
        pool_id: pool.id,
        asset: pool.asset.clone(),
        payment_asset: payment_asset.to_string(),
        transfers,
    };
    supply.verify(&plan)?;

    Ok(Settlement { allocations, plan })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta};
    use sealbid_clearing::clear;
    use sealbid_types::{Address, PoolId};

    use super::*;

    fn make_pool(quantity_for_sale: u128, min_price: u128) -> Pool {
        let t0 = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        Pool {
            id: PoolId(1),
            seller: Address::from_byte(0xee),
            asset: "TOKEN".to_string(),
            quantity_for_sale,
            min_price,
            commit_deadline: t0 + TimeDelta::hours(1),
            reveal_deadline: t0 + TimeDelta::hours(1) + TimeDelta::minutes(15),
            settled: false,
            clearing_price: 0,
            total_allocated: 0,
            created_at: t0,
        }
    }

    /// Bid with one implied price decimal: deposit = quantity * price / 10.
    fn bid(bidder: u8, quantity: u128, price: u128, seq: u64) -> RevealedBid {
        RevealedBid {
            deposit_paid: quantity * price / 10,
            ..RevealedBid::dummy(bidder, quantity, price, seq)
        }
    }

    fn allocation_of(s: &Settlement, bidder: u8) -> &Allocation {
        s.allocations
            .iter()
            .find(|a| a.bidder == Address::from_byte(bidder))
            .unwrap()
    }

    #[test]
    fn reference_scenario_refunds() {
        let pool = make_pool(100, 10);
        let bids = vec![bid(1, 50, 30, 0), bid(2, 60, 20, 1), bid(3, 20, 18, 2)];
        let outcome = clear(&bids, 100, 10);
        let s = settle(&pool, &bids, &outcome, PriceScale::new(1), "NATIVE").unwrap();

        // A: deposit 150, 50 @ 2.0 = 100, refund 50
        let a = allocation_of(&s, 1);
        assert_eq!((a.filled_quantity, a.cost, a.refund_amount), (50, 100, 50));
        // B: deposit 120, 50 @ 2.0 = 100, refund 20
        let b = allocation_of(&s, 2);
        assert_eq!((b.filled_quantity, b.cost, b.refund_amount), (50, 100, 20));
        // C: deposit 36, unfilled, full refund
        let c = allocation_of(&s, 3);
        assert_eq!((c.filled_quantity, c.cost, c.refund_amount), (0, 0, 36));

        assert!(s.plan.transfers.contains(&Transfer::ProceedsToSeller {
            seller: pool.seller,
            amount: 200
        }));
        assert!(
            !s.plan
                .transfers
                .iter()
                .any(|t| matches!(t, Transfer::UnsoldToSeller { .. }))
        );
        assert_eq!(s.plan.asset_out(), 100);
        assert_eq!(s.plan.payment_out(), 150 + 120 + 36);
    }

    #[test]
    fn undersubscribed_returns_unsold_to_seller() {
        let pool = make_pool(100, 10);
        let bids = vec![bid(1, 10, 40, 0), bid(2, 20, 20, 1)];
        let outcome = clear(&bids, 100, 10);
        let s = settle(&pool, &bids, &outcome, PriceScale::new(1), "NATIVE").unwrap();

        assert!(s.plan.transfers.contains(&Transfer::UnsoldToSeller {
            seller: pool.seller,
            quantity: 70
        }));
        // Both pay the reserve (1.0) per unit.
        assert_eq!(allocation_of(&s, 1).cost, 10);
        assert_eq!(allocation_of(&s, 1).refund_amount, 30);
        assert_eq!(allocation_of(&s, 2).cost, 20);
        assert_eq!(allocation_of(&s, 2).refund_amount, 20);
    }

    #[test]
    fn empty_pool_returns_everything_to_seller() {
        let pool = make_pool(100, 10);
        let outcome = clear(&[], 100, 10);
        let s = settle(&pool, &[], &outcome, PriceScale::new(1), "NATIVE").unwrap();
        assert!(s.allocations.is_empty());
        assert_eq!(
            s.plan.transfers,
            vec![Transfer::UnsoldToSeller {
                seller: pool.seller,
                quantity: 100
            }]
        );
    }

    #[test]
    fn zero_refunds_are_not_transferred() {
        let pool = make_pool(10, 5);
        let bids = vec![bid(1, 10, 50, 0)];
        let outcome = clear(&bids, 10, 5);
        let s = settle(&pool, &bids, &outcome, PriceScale::new(1), "NATIVE").unwrap();
        assert_eq!(allocation_of(&s, 1).refund_amount, 0);
        assert!(
            !s.plan
                .transfers
                .iter()
                .any(|t| matches!(t, Transfer::RefundToBidder { .. }))
        );
    }

    #[test]
    fn refund_invariant_over_allocations() {
        let pool = make_pool(75, 10);
        let bids = vec![
            bid(1, 40, 33, 0),
            bid(2, 40, 27, 1),
            bid(3, 40, 27, 2),
            bid(4, 5, 11, 3),
        ];
        let outcome = clear(&bids, 75, 10);
        let s = settle(&pool, &bids, &outcome, PriceScale::new(1), "NATIVE").unwrap();
        for (alloc, bid) in s.allocations.iter().zip(&bids) {
            assert_eq!(alloc.refund_amount, bid.deposit_paid - alloc.cost);
            assert_eq!(
                alloc.cost,
                alloc.filled_quantity * outcome.clearing_price / 10
            );
        }
    }

    #[test]
    fn pool_selling_the_payment_asset_balances() {
        let mut pool = make_pool(100, 10);
        pool.asset = "NATIVE".to_string();
        let bids = vec![bid(1, 10, 20, 0)];
        let outcome = clear(&bids, 100, 10);
        let s = settle(&pool, &bids, &outcome, PriceScale::new(1), "NATIVE").unwrap();

        assert_eq!(s.plan.asset_out(), 100);
        assert_eq!(s.plan.payment_out(), 20);
        assert_eq!(allocation_of(&s, 1).cost, 10);
    }

    #[test]
    fn underfunded_bid_is_conservation_violation() {
        let pool = make_pool(100, 10);
        let mut short = bid(1, 100, 20, 0);
        short.deposit_paid = 1;
        let outcome = clear(std::slice::from_ref(&short), 100, 10);
        let err = settle(&pool, &[short], &outcome, PriceScale::new(1), "NATIVE").unwrap_err();
        assert!(matches!(err, AuctionError::ConservationViolation { .. }));
    }
}
